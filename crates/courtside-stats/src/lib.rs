//! Balance arithmetic and leaderboard views over recorded match events.
//!
//! Everything here is a pure function of the event list handed in; callers
//! re-fetch from the store and recompute on every change.

pub mod aggregate;
pub mod balance;
pub mod views;

pub use aggregate::{match_summary, podium, season_leaderboard, Leaderboard, PlayerBalance, Podium};
pub use balance::{balance, breakdown, classify, efficiency, tally, Classified, Tally};
pub use views::{match_totals, metric_totals, EventFilter, MatchTotals};
