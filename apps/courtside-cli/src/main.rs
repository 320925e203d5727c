use std::{env, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use courtside_ops::{data_file, init_file_tracing, init_tracing};
use courtside_recorder::Recorder;
use courtside_stats::{match_summary, match_totals, metric_totals, season_leaderboard, EventFilter};
use courtside_store::{Backend, EventStore, RosterAdmin, RosterSource};
use courtside_types::{
    config::{CourtsideConfig, StoreBackend},
    events::RecordedEvent,
    metrics,
    roster::{MatchPatch, MatchPlayerName, MatchStatus, NewMatch, NewPlayer, PlayerPatch},
};
use uuid::Uuid;

mod report;
mod ui;

#[derive(Debug, Parser)]
#[command(name = "courtside", about = "Volleyball match statistics tracker")]
struct Cli {
    /// Config file; falls back to $COURTSIDE_CONFIG, then configs/dev.toml.
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage the squad.
    Player {
        #[command(subcommand)]
        action: PlayerCommand,
    },
    /// Manage matches.
    Match {
        #[command(subcommand)]
        action: MatchCommand,
    },
    /// Open the interactive recorder pad for a match.
    Record {
        #[arg(long = "match")]
        match_id: Uuid,
    },
    /// Per-match balance table, optionally narrowed to a set, player or metric.
    Summary {
        #[arg(long = "match")]
        match_id: Uuid,
        #[arg(long)]
        set: Option<u32>,
        #[arg(long)]
        player: Option<Uuid>,
        #[arg(long)]
        metric: Option<String>,
        /// Also list the matching events.
        #[arg(long)]
        events: bool,
        #[arg(long)]
        json: bool,
    },
    /// Season leaderboard across every recorded match.
    Season {
        #[arg(long)]
        player: Option<Uuid>,
        #[arg(long)]
        metric: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List the metric catalog.
    Metrics,
}

#[derive(Debug, Subcommand)]
enum PlayerCommand {
    Add {
        name: String,
        #[arg(long)]
        number: Option<u8>,
        #[arg(long)]
        position: Option<String>,
    },
    List,
    Edit {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        number: Option<u8>,
        #[arg(long)]
        position: Option<String>,
    },
    /// Hide a player from new match rosters; recorded actions are kept.
    Deactivate { id: Uuid },
    Activate { id: Uuid },
    /// Delete a player that has no recorded actions.
    Remove { id: Uuid },
}

#[derive(Debug, Subcommand)]
enum MatchCommand {
    Add {
        #[arg(long)]
        opponent: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Called-up players in pad order; every active player when omitted.
        #[arg(long = "player")]
        roster: Vec<Uuid>,
    },
    List,
    /// Per-match shirt number or nickname shown on the pad.
    Name {
        #[arg(long = "match")]
        match_id: Uuid,
        #[arg(long)]
        player: Uuid,
        #[arg(long)]
        number: Option<u8>,
        #[arg(long)]
        name: Option<String>,
    },
    Edit {
        #[arg(long = "match")]
        match_id: Uuid,
        #[arg(long)]
        opponent: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    Status {
        #[arg(long = "match")]
        match_id: Uuid,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Delete a match and every event recorded for it.
    Remove {
        #[arg(long = "match")]
        match_id: Uuid,
    },
    /// Add a player to the match roster.
    CallUp {
        #[arg(long = "match")]
        match_id: Uuid,
        #[arg(long)]
        player: Uuid,
    },
    /// Take a player off the match roster.
    Drop {
        #[arg(long = "match")]
        match_id: Uuid,
        #[arg(long)]
        player: Uuid,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl From<StatusArg> for MatchStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Scheduled => MatchStatus::Scheduled,
            StatusArg::InProgress => MatchStatus::InProgress,
            StatusArg::Completed => MatchStatus::Completed,
            StatusArg::Cancelled => MatchStatus::Cancelled,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.clone());

    if matches!(cli.command, Command::Record { .. }) {
        init_file_tracing(&config.ops)?;
    } else {
        init_tracing(&config.ops)?;
    }

    let mut store_config = config.store.clone();
    if store_config.backend == StoreBackend::Json {
        if let Some(path) = store_config.path.as_deref() {
            store_config.path = Some(data_file(&config.ops, path).display().to_string());
        }
    }
    let store = courtside_store::open(&store_config).await?;

    match cli.command {
        Command::Player { action } => player_command(&store, action).await,
        Command::Match { action } => match_command(&store, action).await,
        Command::Record { match_id } => record(store, &config, match_id).await,
        Command::Summary {
            match_id,
            set,
            player,
            metric,
            events,
            json,
        } => {
            let filters = event_filter(player, metric, set)?;
            summary(&store, match_id, filters, events, json).await
        }
        Command::Season {
            player,
            metric,
            json,
        } => season(&store, player, metric, json).await,
        Command::Metrics => {
            report::print_catalog(metrics::all());
            Ok(())
        }
    }
}

async fn player_command(store: &Arc<dyn Backend>, action: PlayerCommand) -> Result<()> {
    match action {
        PlayerCommand::Add {
            name,
            number,
            position,
        } => {
            let player = store
                .add_player(NewPlayer {
                    name,
                    number,
                    position,
                })
                .await?;
            println!("{} {}", player.id, player.name);
        }
        PlayerCommand::List => report::print_players(&store.players().await?),
        PlayerCommand::Edit {
            id,
            name,
            number,
            position,
        } => {
            let player = store
                .update_player(
                    id,
                    PlayerPatch {
                        name,
                        number,
                        position,
                    },
                )
                .await?;
            report::print_players(std::slice::from_ref(&player));
        }
        PlayerCommand::Deactivate { id } => {
            let player = store.set_player_active(id, false).await?;
            println!("{} inactive", player.name);
        }
        PlayerCommand::Activate { id } => {
            let player = store.set_player_active(id, true).await?;
            println!("{} active", player.name);
        }
        PlayerCommand::Remove { id } => {
            store
                .remove_player(id)
                .await
                .with_context(|| format!("removing player {id}"))?;
            println!("removed {id}");
        }
    }
    Ok(())
}

async fn match_command(store: &Arc<dyn Backend>, action: MatchCommand) -> Result<()> {
    match action {
        MatchCommand::Add {
            opponent,
            category,
            roster,
        } => {
            let info = store
                .add_match(NewMatch {
                    date: None,
                    opponent,
                    category,
                    roster,
                })
                .await?;
            println!("{} vs {}", info.id, info.opponent_label());
        }
        MatchCommand::List => report::print_matches(&store.matches().await?),
        MatchCommand::Name {
            match_id,
            player,
            number,
            name,
        } => {
            store
                .set_match_name(
                    match_id,
                    MatchPlayerName {
                        player_id: player,
                        match_number: number,
                        custom_name: name,
                    },
                )
                .await?;
        }
        MatchCommand::Edit {
            match_id,
            opponent,
            category,
        } => {
            let info = store
                .update_match(
                    match_id,
                    MatchPatch {
                        date: None,
                        opponent,
                        category,
                    },
                )
                .await?;
            report::print_matches(std::slice::from_ref(&info));
        }
        MatchCommand::Status { match_id, status } => {
            let info = store.set_match_status(match_id, status.into()).await?;
            println!("{} {:?}", info.id, info.status);
        }
        MatchCommand::Remove { match_id } => {
            store.remove_match(match_id).await?;
            println!("removed {match_id}");
        }
        MatchCommand::CallUp { match_id, player } => {
            let info = store.add_to_roster(match_id, player).await?;
            println!("{} players called up", info.roster.len());
        }
        MatchCommand::Drop { match_id, player } => {
            let info = store.remove_from_roster(match_id, player).await?;
            println!("{} players called up", info.roster.len());
        }
    }
    Ok(())
}

async fn record(store: Arc<dyn Backend>, config: &CourtsideConfig, match_id: Uuid) -> Result<()> {
    let mut info = store
        .match_info(match_id)
        .await
        .with_context(|| format!("loading match {match_id}"))?;
    if info.status == MatchStatus::Scheduled {
        info = store.set_match_status(match_id, MatchStatus::InProgress).await?;
    }
    let players = store.match_roster(match_id).await?;
    let roster = players.iter().map(|p| p.id).collect();
    let recorder = Recorder::open(store, match_id, roster, &config.recorder).await?;
    ui::run(recorder, info, players, config.recorder.shortcut_slots).await
}

async fn summary(
    store: &Arc<dyn Backend>,
    match_id: Uuid,
    filters: EventFilter,
    list_events: bool,
    json: bool,
) -> Result<()> {
    let info = store.match_info(match_id).await?;
    let players = store.match_roster(match_id).await?;
    let roster: Vec<_> = players.iter().map(|p| p.id).collect();
    // Always recomputed from a full re-fetch.
    let events = store.list(match_id).await?;
    let scoped: Vec<RecordedEvent> = filters.apply(&events).into_iter().cloned().collect();
    let rows = match_summary(&scoped, &roster);
    let listed: &[RecordedEvent] = if list_events || !filters.is_empty() {
        scoped.as_slice()
    } else {
        &[]
    };
    if json {
        let doc = serde_json::json!({ "summary": rows, "events": listed });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        report::print_match_header(&info, &match_totals(&scoped, &roster));
        report::print_metric_totals(&metric_totals(&scoped));
        report::print_balances(&rows, &players);
        if !listed.is_empty() {
            println!();
            report::print_events(listed, &info, &players);
        }
    }
    Ok(())
}

async fn season(
    store: &Arc<dyn Backend>,
    player: Option<Uuid>,
    metric: Option<String>,
    json: bool,
) -> Result<()> {
    let players = store.players().await?;
    let roster: Vec<_> = players.iter().map(|p| p.id).collect();
    let events = store.list_all().await?;
    let filters = event_filter(player, metric, None)?;
    let board = season_leaderboard(&events, &roster, &filters);
    if json {
        println!("{}", serde_json::to_string_pretty(&board)?);
    } else {
        report::print_leaderboard(&board, &players);
    }
    Ok(())
}

fn event_filter(
    player: Option<Uuid>,
    metric: Option<String>,
    set: Option<u32>,
) -> Result<EventFilter> {
    if let Some(code) = metric.as_deref() {
        if metrics::definition(code).is_none() {
            anyhow::bail!("unknown metric code '{code}'");
        }
    }
    if set == Some(0) {
        anyhow::bail!("set numbers start at 1");
    }
    Ok(EventFilter {
        player_id: player,
        metric_code: metric,
        set_number: set,
    })
}

fn load_config(from_args: Option<String>) -> CourtsideConfig {
    let from_env = env::var("COURTSIDE_CONFIG").ok();
    let path = from_args
        .or(from_env)
        .unwrap_or_else(|| "configs/dev.toml".into());
    match CourtsideConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path
                );
                default_config()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path
            );
            default_config()
        }
    }
}

fn default_config() -> CourtsideConfig {
    let mut config = CourtsideConfig::default();
    // One-shot commands need state that outlives the process.
    config.store.backend = StoreBackend::Json;
    config.store.path = Some("season.json".into());
    debug_assert!(config.validate().is_ok());
    config
}
