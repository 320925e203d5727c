use std::fmt::Write as _;

use courtside_stats::{
    balance::{format_balance, format_efficiency},
    podium, Leaderboard, MatchTotals, PlayerBalance, Podium,
};
use courtside_types::{
    events::{PlayerId, RecordedEvent},
    metrics::{self, MetricDefinition, Polarity},
    roster::{MatchInfo, Player},
};

pub fn print_catalog(catalog: &[MetricDefinition]) {
    for def in catalog {
        let sign = match def.polarity {
            Polarity::Positive => '+',
            Polarity::Negative => '-',
        };
        println!("{:<4} {sign} {:<18} {}", def.code, def.label, def.description);
    }
}

pub fn print_players(players: &[Player]) {
    for player in players {
        let number = player
            .number
            .map(|n| format!("#{n}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "{} {:<4} {:<24} {}",
            player.id,
            number,
            player.name,
            player.position.as_deref().unwrap_or("")
        );
    }
}

pub fn print_matches(matches: &[MatchInfo]) {
    for info in matches {
        println!(
            "{} {} vs {:<20} {:?} ({} players)",
            info.id,
            info.date.format("%Y-%m-%d"),
            info.opponent_label(),
            info.status,
            info.roster.len()
        );
    }
}

pub fn print_match_header(info: &MatchInfo, totals: &MatchTotals) {
    println!(
        "{} vs {}  acciones {}  jugadoras {}  +{} / -{}",
        info.date.format("%Y-%m-%d"),
        info.opponent_label(),
        totals.total_actions,
        totals.active_players,
        totals.positive_actions,
        totals.negative_actions
    );
}

pub fn print_metric_totals(totals: &[(&'static MetricDefinition, usize)]) {
    let line: Vec<String> = totals
        .iter()
        .map(|(def, count)| format!("{} {count}", def.code))
        .collect();
    println!("{}", line.join("  "));
}

pub fn print_balances(rows: &[PlayerBalance], players: &[Player]) {
    print!("{}", render_balances(rows, players));
}

pub fn print_leaderboard(board: &Leaderboard, players: &[Player]) {
    if let Some(mvp) = board.mvp_row() {
        println!(
            "MVP: {} ({})",
            player_name(players, mvp.player_id),
            format_balance(mvp.balance)
        );
    }
    print!("{}", render_balances(&board.rows, players));
}

fn render_balances(rows: &[PlayerBalance], players: &[Player]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<3} {:<24} {:>7} {:>10} {:>5} {:>5} {:>5} {:>4}",
        "#", "Jugadora", "Balance", "Eficiencia", "Total", "+", "-", "PJ"
    );
    for (rank, row) in rows.iter().enumerate() {
        let medal = match podium(rank) {
            Some(Podium::Gold) => "1*",
            Some(Podium::Silver) => "2*",
            Some(Podium::Bronze) => "3*",
            None => "",
        };
        let _ = writeln!(
            out,
            "{:<3} {:<24} {:>7} {:>10} {:>5} {:>5} {:>5} {:>4}",
            if medal.is_empty() {
                (rank + 1).to_string()
            } else {
                medal.to_string()
            },
            player_name(players, row.player_id),
            format_balance(row.balance),
            format_efficiency(row.efficiency),
            row.total_actions,
            row.positive_actions,
            row.negative_actions,
            row.matches_played
        );
    }
    out
}

pub fn print_events(events: &[RecordedEvent], info: &MatchInfo, players: &[Player]) {
    print!("{}", render_events(events, info, players));
}

/// One line per event in commit order, labelled the way the pad labels players.
fn render_events(events: &[RecordedEvent], info: &MatchInfo, players: &[Player]) -> String {
    let mut out = String::new();
    for event in events {
        let sign = match metrics::polarity_of(&event.metric_code) {
            Some(Polarity::Positive) => "+",
            Some(Polarity::Negative) => "-",
            None => "?",
        };
        let who = match players.iter().position(|p| p.id == event.player_id) {
            Some(slot) => format!(
                "{} {}",
                info.slot_label(event.player_id, slot),
                players[slot].name
            ),
            None => event.player_id.to_string(),
        };
        let _ = writeln!(
            out,
            "{} set {} #{:<3} {:<4} {sign} {who}",
            event.recorded_at.format("%H:%M:%S"),
            event.set_number,
            event.point_number,
            event.metric_code
        );
    }
    out
}

fn player_name(players: &[Player], id: PlayerId) -> String {
    players
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}
