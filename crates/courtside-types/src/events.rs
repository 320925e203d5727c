use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    metrics::{polarity_of, Metric, Polarity},
    CourtsideError, Result,
};

pub type MatchId = Uuid;
pub type PlayerId = Uuid;
pub type EventId = Uuid;

/// One in-game action attributed to one player.
///
/// `metric_code` is kept as the raw string read from storage; rows written by
/// other clients are not guaranteed to reference the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub id: EventId,
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub set_number: u32,
    pub point_number: u32,
    pub metric_code: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RecordedEvent {
    pub fn metric(&self) -> Option<Metric> {
        Metric::from_code(&self.metric_code)
    }

    pub fn polarity(&self) -> Option<Polarity> {
        polarity_of(&self.metric_code)
    }
}

/// Append payload for the event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub set_number: u32,
    pub point_number: u32,
    pub metric_code: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewEvent {
    pub fn new(
        match_id: MatchId,
        player_id: PlayerId,
        set_number: u32,
        point_number: u32,
        metric: Metric,
    ) -> Self {
        Self {
            match_id,
            player_id,
            set_number,
            point_number,
            metric_code: metric.code().to_string(),
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<Metric> {
        if self.set_number == 0 {
            return Err(CourtsideError::validation("set_number must be at least 1"));
        }
        Metric::from_code(&self.metric_code).ok_or_else(|| {
            CourtsideError::validation(format!("unknown metric code '{}'", self.metric_code))
        })
    }

    /// Stamps id and timestamp; only stores call this.
    pub fn into_recorded(self) -> RecordedEvent {
        RecordedEvent {
            id: Uuid::new_v4(),
            match_id: self.match_id,
            player_id: self.player_id,
            set_number: self.set_number,
            point_number: self.point_number,
            metric_code: self.metric_code,
            recorded_at: Utc::now(),
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Appended(EventId),
    Deleted(EventId),
    /// The subscriber fell behind and missed this many notifications.
    Lagged(u64),
}

/// Row-change notification published by an event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChange {
    pub match_id: MatchId,
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl StoreChange {
    pub fn appended(event: &RecordedEvent) -> Self {
        Self {
            match_id: event.match_id,
            kind: ChangeKind::Appended(event.id),
            timestamp: Utc::now(),
        }
    }

    pub fn deleted(event: &RecordedEvent) -> Self {
        Self {
            match_id: event.match_id,
            kind: ChangeKind::Deleted(event.id),
            timestamp: Utc::now(),
        }
    }

    pub fn lagged(match_id: MatchId, missed: u64) -> Self {
        Self {
            match_id,
            kind: ChangeKind::Lagged(missed),
            timestamp: Utc::now(),
        }
    }
}
