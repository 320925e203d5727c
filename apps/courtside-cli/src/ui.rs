use std::{collections::VecDeque, sync::Arc, time::Duration};

use anyhow::Result;
use courtside_recorder::{Input, Key, Outcome, PadKeys, Phase, Recorder, Settled, KEY_HELP};
use courtside_stats::{
    balance::{format_balance, format_efficiency},
    match_summary, podium, PlayerBalance, Podium,
};
use courtside_store::Backend;
use courtside_types::{
    events::RecordedEvent,
    metrics,
    roster::{MatchInfo, Player},
    CourtsideError,
};
use crossterm::{
    event::{Event as CEvent, EventStream, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Row, Table},
    Frame, Terminal,
};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

const MAX_LOG_ENTRIES: usize = 120;
const ROSTER_ROWS: usize = 10;
/// How often the pad re-reads the store to pick up other writers.
const SYNC_INTERVAL: Duration = Duration::from_secs(1);

type Session = Recorder<Arc<dyn Backend>>;

struct Pad {
    info: MatchInfo,
    players: Vec<Player>,
    events: Vec<RecordedEvent>,
    keys: PadKeys,
    shortcut_slots: usize,
    logs: VecDeque<String>,
    status: String,
}

impl Pad {
    fn log(&mut self, line: String) {
        if self.logs.len() == MAX_LOG_ENTRIES {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    fn label(&self, player_id: uuid::Uuid) -> String {
        let Some(slot) = self.players.iter().position(|p| p.id == player_id) else {
            return player_id.to_string();
        };
        let name = &self.players[slot].name;
        format!("{} {}", self.info.slot_label(player_id, slot), name)
    }

    /// Balance table input; always a full re-fetch.
    async fn refresh(&mut self, recorder: &Session) {
        match recorder.events().await {
            Ok(events) => self.events = events,
            Err(err) => self.status = format!("Error al leer eventos: {err}"),
        }
    }
}

pub async fn run(
    recorder: Session,
    info: MatchInfo,
    players: Vec<Player>,
    shortcut_slots: u8,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let res = run_loop(&mut terminal, recorder, info, players, shortcut_slots).await;

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    res
}

async fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut recorder: Session,
    info: MatchInfo,
    players: Vec<Player>,
    shortcut_slots: u8,
) -> Result<()> {
    let mut subscription = recorder.subscribe();
    let mut keys = EventStream::new();
    let mut sync_tick = time::interval(SYNC_INTERVAL);
    sync_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pad = Pad {
        info,
        players,
        events: recorder.events().await?,
        keys: PadKeys::new(shortcut_slots),
        shortcut_slots: usize::from(shortcut_slots),
        logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
        status: "Listo".to_string(),
    };

    loop {
        terminal.draw(|f| draw(f, &pad, &recorder))?;
        let deadline = recorder.pending_deadline();

        tokio::select! {
            next_key = keys.next() => {
                let Some(event) = next_key else { break };
                let CEvent::Key(key) = event? else { continue };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let key = match key.code {
                    KeyCode::Char('q') => break,
                    KeyCode::Char(c) => Key::Char(c),
                    KeyCode::Backspace => Key::Backspace,
                    KeyCode::Esc => Key::Esc,
                    KeyCode::Up => Key::Up,
                    KeyCode::Down => Key::Down,
                    KeyCode::Enter => Key::Enter,
                    _ => continue,
                };
                let roster = recorder.roster().to_vec();
                if let Some(input) = pad.keys.resolve(key, &roster) {
                    handle_input(&mut recorder, &mut pad, input).await;
                }
            }
            change = subscription.next() => {
                let Some(change) = change else {
                    pad.status = "El almacén se cerró".to_string();
                    break;
                };
                match recorder.on_change(change).await {
                    Ok(report) if report.drifted() => {
                        pad.status = format!("Sincronizado: punto {}", report.stored);
                    }
                    Ok(_) => {}
                    Err(err) => pad.status = format!("Error de sincronización: {err}"),
                }
                pad.refresh(&recorder).await;
            }
            _ = pending_expiry(deadline) => {
                if let Some(Settled::TimedOut) = recorder.expire_pending(Instant::now()) {
                    pad.status = "Selección expirada".to_string();
                }
            }
            _ = sync_tick.tick() => {
                // Writers in other processes do not reach this feed.
                match recorder.ensure_in_sync().await {
                    Ok(()) => {}
                    Err(CourtsideError::ConcurrentDrift { .. }) => match recorder.resync().await {
                        Ok(report) => {
                            pad.status = format!("Sincronizado: punto {}", report.stored);
                        }
                        Err(err) => pad.status = format!("Error de sincronización: {err}"),
                    },
                    Err(err) => pad.status = format!("Error de sincronización: {err}"),
                }
                pad.refresh(&recorder).await;
            }
        }
    }

    subscription.unsubscribe();
    info!(match_id = %recorder.state().match_id, "Recorder session closed");
    Ok(())
}

async fn pending_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn handle_input(recorder: &mut Session, pad: &mut Pad, input: Input) {
    match recorder.handle(input).await {
        Ok(outcome) => {
            describe(pad, &outcome);
            if matches!(outcome, Outcome::Committed(_) | Outcome::Undone(_)) {
                pad.refresh(recorder).await;
            }
        }
        Err(err) => {
            warn!("input rejected: {err}");
            pad.status = format!("Error: {err}");
        }
    }
}

fn draw(f: &mut Frame, pad: &Pad, recorder: &Session) {
    let roster_height = pad.players.len().clamp(1, ROSTER_ROWS) as u16 + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(roster_height),
                Constraint::Min(6),
                Constraint::Length(8),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let state = recorder.state();
    let pending = match &state.phase {
        Phase::Idle => "—".to_string(),
        Phase::MetricPending(code) => metrics::definition(code)
            .map(|def| format!("{} ({})", def.code, def.label))
            .unwrap_or_else(|| code.clone()),
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("vs {}", pad.info.opponent_label()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("Set:", Style::default().fg(Color::Magenta)),
        Span::raw(format!(" {}  ", state.current_set)),
        Span::styled("Punto:", Style::default().fg(Color::Magenta)),
        Span::raw(format!(" {}  ", state.current_point)),
        Span::styled("Métrica:", Style::default().fg(Color::Magenta)),
        Span::raw(format!(" {pending}  ")),
        Span::raw(pad.status.clone()),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Partido"));
    f.render_widget(header, chunks[0]);

    let slots: Vec<ListItem> = pad
        .players
        .iter()
        .enumerate()
        .map(|(slot, player)| {
            let shortcut = if slot < pad.shortcut_slots {
                format!("[{}]", slot + 1)
            } else {
                "   ".to_string()
            };
            ListItem::new(format!("{shortcut} {}", pad.label(player.id)))
        })
        .collect();
    let pad_list = List::new(slots)
        .block(Block::default().borders(Borders::ALL).title("Jugadoras"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut cursor = ListState::default().with_selected(Some(pad.keys.cursor()));
    f.render_stateful_widget(pad_list, chunks[1], &mut cursor);

    let rows = match_summary(&pad.events, recorder.roster());
    let table_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(rank, row)| summary_row(pad, rank, row))
        .collect();
    let widths = [
        Constraint::Percentage(40),
        Constraint::Percentage(15),
        Constraint::Percentage(15),
        Constraint::Percentage(15),
        Constraint::Percentage(15),
    ];
    let table = Table::new(table_rows, widths)
        .header(
            Row::new(vec!["Jugadora", "Balance", "Eficiencia", "+", "-"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title("Balance"));
    f.render_widget(table, chunks[2]);

    let items: Vec<ListItem> = pad
        .logs
        .iter()
        .rev()
        .map(|entry| ListItem::new(entry.clone()))
        .collect();
    let list =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Últimas acciones"));
    f.render_widget(list, chunks[3]);

    let help = Paragraph::new(Line::from(vec![
        Span::raw(KEY_HELP),
        Span::raw("  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" salir"),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[4]);
}

fn summary_row<'a>(pad: &Pad, rank: usize, row: &PlayerBalance) -> Row<'a> {
    let style = match podium(rank) {
        Some(Podium::Gold) => Style::default().fg(Color::Yellow),
        Some(Podium::Silver) => Style::default().fg(Color::Gray),
        Some(Podium::Bronze) => Style::default().fg(Color::LightRed),
        None => Style::default(),
    };
    Row::new(vec![
        pad.label(row.player_id),
        format_balance(row.balance),
        format_efficiency(row.efficiency),
        row.positive_actions.to_string(),
        row.negative_actions.to_string(),
    ])
    .style(style)
}

fn describe(pad: &mut Pad, outcome: &Outcome) {
    match outcome {
        Outcome::Committed(event) => {
            let line = format!(
                "[{}] set {} #{} {} {}",
                event.recorded_at.format("%H:%M:%S"),
                event.set_number,
                event.point_number,
                event.metric_code,
                pad.label(event.player_id)
            );
            pad.log(line);
            pad.status = "Registrado".to_string();
        }
        Outcome::Undone(event) => {
            let line = format!("deshecho {} {}", event.metric_code, pad.label(event.player_id));
            pad.log(line);
            pad.status = "Deshecho".to_string();
        }
        Outcome::NothingToUndo => pad.status = "Nada que deshacer".to_string(),
        Outcome::Settled(settled) => {
            pad.status = match settled {
                Settled::MetricPending(code) => format!("{code}: elige jugadora"),
                Settled::Cancelled => "Cancelado".to_string(),
                Settled::TimedOut => "Selección expirada".to_string(),
                Settled::SetChanged(set) => format!("Set {set}"),
                Settled::Ignored(reason) => format!("Ignorado ({reason:?})"),
            }
        }
    }
}
