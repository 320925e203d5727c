use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    events::{MatchId, PlayerId},
    CourtsideError, Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub number: Option<u8>,
    pub position: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewPlayer {
    pub name: String,
    pub number: Option<u8>,
    pub position: Option<String>,
}

impl NewPlayer {
    pub fn validate(&self) -> Result<()> {
        let len = self.name.trim().chars().count();
        if !(2..=100).contains(&len) {
            return Err(CourtsideError::validation(
                "player name must be between 2 and 100 characters",
            ));
        }
        if matches!(self.number, Some(n) if n > 99) {
            return Err(CourtsideError::validation(
                "player number must be between 0 and 99",
            ));
        }
        Ok(())
    }

    pub fn into_player(self) -> Result<Player> {
        self.validate()?;
        Ok(Player {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            number: self.number,
            position: self.position,
            active: true,
            created_at: Utc::now(),
        })
    }
}

/// Partial edit of a squad entry. `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerPatch {
    pub name: Option<String>,
    pub number: Option<u8>,
    pub position: Option<String>,
}

impl PlayerPatch {
    pub fn apply(self, player: &Player) -> Result<Player> {
        let candidate = NewPlayer {
            name: self.name.unwrap_or_else(|| player.name.clone()),
            number: self.number.or(player.number),
            position: self.position.or_else(|| player.position.clone()),
        };
        candidate.validate()?;
        Ok(Player {
            name: candidate.name.trim().to_string(),
            number: candidate.number,
            position: candidate.position,
            ..player.clone()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// Match metadata used for labelling only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub id: MatchId,
    pub date: DateTime<Utc>,
    pub opponent: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub status: MatchStatus,
    /// Players called up for this match, in slot order.
    #[serde(default)]
    pub roster: Vec<PlayerId>,
    #[serde(default)]
    pub player_names: Vec<MatchPlayerName>,
}

impl MatchInfo {
    pub fn opponent_label(&self) -> &str {
        self.opponent.as_deref().unwrap_or("Unknown")
    }

    pub fn name_override(&self, player_id: PlayerId) -> Option<&MatchPlayerName> {
        self.player_names
            .iter()
            .find(|entry| entry.player_id == player_id)
    }

    /// Label shown on the recorder pad: custom name, then match number, then the 1-based slot.
    pub fn slot_label(&self, player_id: PlayerId, slot: usize) -> String {
        let entry = self.name_override(player_id);
        if let Some(custom) = entry
            .and_then(|e| e.custom_name.as_deref())
            .filter(|name| !name.trim().is_empty())
        {
            return custom.to_string();
        }
        if let Some(number) = entry.and_then(|e| e.match_number) {
            return number.to_string();
        }
        (slot + 1).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewMatch {
    pub date: Option<DateTime<Utc>>,
    pub opponent: Option<String>,
    pub category: Option<String>,
    pub roster: Vec<PlayerId>,
}

impl NewMatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(opponent) = &self.opponent {
            if opponent.trim().chars().count() < 2 {
                return Err(CourtsideError::validation(
                    "opponent must be at least 2 characters",
                ));
            }
        }
        Ok(())
    }

    pub fn into_match(self) -> Result<MatchInfo> {
        self.validate()?;
        Ok(MatchInfo {
            id: Uuid::new_v4(),
            date: self.date.unwrap_or_else(Utc::now),
            opponent: self.opponent,
            category: self.category,
            status: MatchStatus::Scheduled,
            roster: self.roster,
            player_names: Vec::new(),
        })
    }
}

/// Partial edit of match metadata. `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchPatch {
    pub date: Option<DateTime<Utc>>,
    pub opponent: Option<String>,
    pub category: Option<String>,
}

impl MatchPatch {
    pub fn apply(self, info: &MatchInfo) -> Result<MatchInfo> {
        let candidate = NewMatch {
            date: self.date.or(Some(info.date)),
            opponent: self.opponent.or_else(|| info.opponent.clone()),
            category: self.category.or_else(|| info.category.clone()),
            roster: Vec::new(),
        };
        candidate.validate()?;
        Ok(MatchInfo {
            date: candidate.date.unwrap_or(info.date),
            opponent: candidate.opponent,
            category: candidate.category,
            ..info.clone()
        })
    }
}

/// Per-match shirt number or nickname overriding the default slot label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPlayerName {
    pub player_id: PlayerId,
    pub match_number: Option<u8>,
    pub custom_name: Option<String>,
}
