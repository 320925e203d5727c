use std::collections::{BTreeMap, HashSet};

use courtside_types::events::{MatchId, PlayerId, RecordedEvent};
use serde::Serialize;
use tracing::debug;

use crate::{balance::tally, views::EventFilter};

/// Derived per-player numbers for one scope. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerBalance {
    pub player_id: PlayerId,
    pub total_actions: usize,
    pub positive_actions: usize,
    pub negative_actions: usize,
    pub balance: i64,
    pub efficiency: Option<f64>,
    pub breakdown: BTreeMap<String, usize>,
    /// Distinct matches touched by the player's events in scope.
    pub matches_played: usize,
}

impl PlayerBalance {
    pub fn from_events<'a, I>(player_id: PlayerId, events: I) -> Self
    where
        I: IntoIterator<Item = &'a RecordedEvent>,
    {
        let mut matches: HashSet<MatchId> = HashSet::new();
        let scoped: Vec<&RecordedEvent> = events
            .into_iter()
            .filter(|event| event.player_id == player_id)
            .inspect(|event| {
                matches.insert(event.match_id);
            })
            .collect();
        let summary = tally(scoped);
        Self {
            player_id,
            total_actions: summary.total,
            positive_actions: summary.positive,
            negative_actions: summary.negative,
            balance: summary.balance(),
            efficiency: summary.efficiency(),
            breakdown: summary.breakdown,
            matches_played: matches.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Podium {
    Gold,
    Silver,
    Bronze,
}

/// Only the first three ranks get distinguished presentation.
pub fn podium(rank: usize) -> Option<Podium> {
    match rank {
        0 => Some(Podium::Gold),
        1 => Some(Podium::Silver),
        2 => Some(Podium::Bronze),
        _ => None,
    }
}

/// Per-match table: every roster player, balance descending, ties in roster order.
pub fn match_summary(events: &[RecordedEvent], roster: &[PlayerId]) -> Vec<PlayerBalance> {
    rank_roster(events.iter(), roster)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub rows: Vec<PlayerBalance>,
    /// Top-ranked player, only when their balance is strictly positive.
    pub mvp: Option<PlayerId>,
}

impl Leaderboard {
    pub fn mvp_row(&self) -> Option<&PlayerBalance> {
        let mvp = self.mvp?;
        self.rows.iter().find(|row| row.player_id == mvp)
    }
}

pub fn season_leaderboard(
    events: &[RecordedEvent],
    roster: &[PlayerId],
    filters: &EventFilter,
) -> Leaderboard {
    let rows = rank_roster(events.iter().filter(|event| filters.matches(event)), roster);
    let mvp = rows
        .first()
        .filter(|top| top.balance > 0)
        .map(|top| top.player_id);
    debug!(
        players = rows.len(),
        mvp = ?mvp,
        "season leaderboard computed"
    );
    Leaderboard { rows, mvp }
}

fn rank_roster<'a, I>(events: I, roster: &[PlayerId]) -> Vec<PlayerBalance>
where
    I: Iterator<Item = &'a RecordedEvent>,
{
    let scoped: Vec<&RecordedEvent> = events.collect();
    let mut seen = HashSet::new();
    let mut rows: Vec<(usize, PlayerBalance)> = roster
        .iter()
        .filter(|id| seen.insert(**id))
        .enumerate()
        .map(|(slot, id)| (slot, PlayerBalance::from_events(*id, scoped.iter().copied())))
        .collect();
    // Explicit tie-break on roster slot so the order never depends on sort stability.
    rows.sort_by(|(slot_a, a), (slot_b, b)| {
        b.balance.cmp(&a.balance).then(slot_a.cmp(slot_b))
    });
    rows.into_iter().map(|(_, row)| row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::event;
    use uuid::Uuid;

    struct Squad {
        ana: PlayerId,
        beto: PlayerId,
        caro: PlayerId,
    }

    impl Squad {
        fn new() -> Self {
            Self {
                ana: Uuid::new_v4(),
                beto: Uuid::new_v4(),
                caro: Uuid::new_v4(),
            }
        }

        fn roster(&self) -> Vec<PlayerId> {
            vec![self.ana, self.beto, self.caro]
        }
    }

    #[test]
    fn match_summary_orders_by_balance_then_roster() {
        let squad = Squad::new();
        let m = Uuid::new_v4();
        let events = vec![
            event(m, squad.ana, "S", 0),
            event(m, squad.ana, "ES", 1),
            event(m, squad.beto, "B", 2),
            event(m, squad.beto, "B", 3),
        ];

        let rows = match_summary(&events, &squad.roster());
        let order: Vec<_> = rows.iter().map(|r| r.player_id).collect();
        assert_eq!(order, vec![squad.beto, squad.ana, squad.caro]);
        assert_eq!(rows[0].balance, 2);
        assert_eq!(rows[1].balance, 0);
        assert_eq!(rows[2].balance, 0);
        assert_eq!(rows[2].total_actions, 0);
        assert_eq!(rows[2].efficiency, None);
        assert_eq!(rows[1].efficiency, Some(0.5));
    }

    #[test]
    fn match_summary_is_idempotent() {
        let squad = Squad::new();
        let m = Uuid::new_v4();
        let events = vec![
            event(m, squad.caro, "CA", 0),
            event(m, squad.ana, "AR", 1),
            event(m, squad.beto, "EA", 2),
        ];
        let first = match_summary(&events, &squad.roster());
        let second = match_summary(&events, &squad.roster());
        assert_eq!(first, second);
    }

    #[test]
    fn events_for_players_outside_the_roster_are_ignored() {
        let squad = Squad::new();
        let m = Uuid::new_v4();
        let events = vec![event(m, Uuid::new_v4(), "S", 0), event(m, squad.ana, "S", 1)];
        let rows = match_summary(&events, &squad.roster());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().map(|r| r.total_actions).sum::<usize>(), 1);
    }

    #[test]
    fn podium_covers_first_three_ranks() {
        assert_eq!(podium(0), Some(Podium::Gold));
        assert_eq!(podium(1), Some(Podium::Silver));
        assert_eq!(podium(2), Some(Podium::Bronze));
        assert_eq!(podium(3), None);
    }

    #[test]
    fn season_leaderboard_filtered_by_metric() {
        let squad = Squad::new();
        let (m1, m2) = (Uuid::new_v4(), Uuid::new_v4());
        let events = vec![
            event(m1, squad.ana, "B", 0),
            event(m1, squad.ana, "S", 1),
            event(m2, squad.ana, "B", 2),
            event(m2, squad.beto, "B", 3),
            event(m2, squad.beto, "ENF", 4),
            event(m1, squad.caro, "EA", 5),
        ];
        let filters = EventFilter {
            metric_code: Some("B".into()),
            ..Default::default()
        };
        let board = season_leaderboard(&events, &squad.roster(), &filters);
        for row in &board.rows {
            let blocks = events
                .iter()
                .filter(|e| e.player_id == row.player_id && e.metric_code == "B")
                .count();
            assert_eq!(row.total_actions, blocks);
            assert!(row.breakdown.keys().all(|code| code == "B"));
        }
        let ana = board.rows.iter().find(|r| r.player_id == squad.ana).expect("ana");
        assert_eq!(ana.matches_played, 2);
        assert_eq!(board.mvp, Some(squad.ana));
    }

    #[test]
    fn season_leaderboard_filtered_by_player_keeps_roster() {
        let squad = Squad::new();
        let m = Uuid::new_v4();
        let events = vec![event(m, squad.ana, "S", 0), event(m, squad.beto, "S", 1)];
        let filters = EventFilter {
            player_id: Some(squad.beto),
            ..Default::default()
        };
        let board = season_leaderboard(&events, &squad.roster(), &filters);
        assert_eq!(board.rows.len(), 3);
        assert_eq!(board.rows[0].player_id, squad.beto);
        let ana = board.rows.iter().find(|r| r.player_id == squad.ana).expect("ana");
        assert_eq!(ana.total_actions, 0);
    }

    #[test]
    fn no_mvp_without_positive_balance() {
        let squad = Squad::new();
        let m = Uuid::new_v4();
        let events = vec![event(m, squad.ana, "S", 0), event(m, squad.ana, "ES", 1)];
        let board = season_leaderboard(&events, &squad.roster(), &EventFilter::default());
        assert_eq!(board.rows[0].balance, 0);
        assert_eq!(board.mvp, None);
        assert!(board.mvp_row().is_none());

        let empty = season_leaderboard(&[], &[], &EventFilter::default());
        assert!(empty.rows.is_empty());
        assert_eq!(empty.mvp, None);
    }
}
