//! Event store gateway and roster lookups, with in-memory and json-file backends.

use std::sync::Arc;

use async_trait::async_trait;
use courtside_types::{
    config::{StoreBackend, StoreConfig},
    events::{EventId, MatchId, NewEvent, PlayerId, RecordedEvent},
    roster::{
        MatchInfo, MatchPatch, MatchPlayerName, MatchStatus, NewMatch, NewPlayer, Player,
        PlayerPatch,
    },
    CourtsideError, Result,
};
use tracing::info;

mod dataset;
mod feed;
mod json;
mod memory;

pub use dataset::Dataset;
pub use feed::{ChangeFeed, Subscription};
pub use json::JsonFileStore;
pub use memory::InMemoryStore;

/// Append/delete/list access to recorded events plus a change feed.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: NewEvent) -> Result<RecordedEvent>;
    async fn delete_by_id(&self, id: EventId) -> Result<()>;
    /// Events of one match in commit order, oldest first.
    async fn list(&self, match_id: MatchId) -> Result<Vec<RecordedEvent>>;
    async fn list_all(&self) -> Result<Vec<RecordedEvent>>;
    fn subscribe(&self, match_id: MatchId) -> Subscription;
}

/// Read-only player and match lookups used for labelling.
#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn players(&self) -> Result<Vec<Player>>;
    async fn player(&self, id: PlayerId) -> Result<Player>;
    async fn matches(&self) -> Result<Vec<MatchInfo>>;
    async fn match_info(&self, id: MatchId) -> Result<MatchInfo>;

    /// Called-up players in slot order; every active player when the match has no explicit roster.
    async fn match_roster(&self, match_id: MatchId) -> Result<Vec<Player>> {
        let info = self.match_info(match_id).await?;
        let players = self.players().await?;
        if info.roster.is_empty() {
            return Ok(players.into_iter().filter(|p| p.active).collect());
        }
        Ok(info
            .roster
            .iter()
            .filter_map(|id| players.iter().find(|p| p.id == *id).cloned())
            .collect())
    }
}

/// Squad and match maintenance.
#[async_trait]
pub trait RosterAdmin: Send + Sync {
    async fn add_player(&self, player: NewPlayer) -> Result<Player>;
    async fn update_player(&self, id: PlayerId, patch: PlayerPatch) -> Result<Player>;
    async fn set_player_active(&self, id: PlayerId, active: bool) -> Result<Player>;
    /// Refused with a validation error once the player has recorded actions.
    async fn remove_player(&self, id: PlayerId) -> Result<()>;
    async fn add_match(&self, info: NewMatch) -> Result<MatchInfo>;
    async fn update_match(&self, id: MatchId, patch: MatchPatch) -> Result<MatchInfo>;
    async fn set_match_status(&self, id: MatchId, status: MatchStatus) -> Result<MatchInfo>;
    /// Removes the match and every event recorded for it.
    async fn remove_match(&self, id: MatchId) -> Result<()>;
    async fn add_to_roster(&self, match_id: MatchId, player_id: PlayerId) -> Result<MatchInfo>;
    async fn remove_from_roster(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
    ) -> Result<MatchInfo>;
    async fn set_match_name(&self, match_id: MatchId, name: MatchPlayerName) -> Result<()>;
}

/// A store usable for everything the CLI needs.
pub trait Backend: EventStore + RosterSource + RosterAdmin {}

impl<T: EventStore + RosterSource + RosterAdmin> Backend for T {}

pub async fn open(config: &StoreConfig) -> Result<Arc<dyn Backend>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory event store");
            Ok(Arc::new(InMemoryStore::new(config.channel_capacity)))
        }
        StoreBackend::Json => {
            let path = config.path.as_deref().ok_or_else(|| {
                CourtsideError::Configuration("store.path is required for the json backend".into())
            })?;
            info!("Using json event store at {}", path);
            let store = JsonFileStore::open(path, config.channel_capacity).await?;
            Ok(Arc::new(store))
        }
    }
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    async fn append(&self, event: NewEvent) -> Result<RecordedEvent> {
        (**self).append(event).await
    }

    async fn delete_by_id(&self, id: EventId) -> Result<()> {
        (**self).delete_by_id(id).await
    }

    async fn list(&self, match_id: MatchId) -> Result<Vec<RecordedEvent>> {
        (**self).list(match_id).await
    }

    async fn list_all(&self) -> Result<Vec<RecordedEvent>> {
        (**self).list_all().await
    }

    fn subscribe(&self, match_id: MatchId) -> Subscription {
        (**self).subscribe(match_id)
    }
}

#[async_trait]
impl<T: RosterSource + ?Sized> RosterSource for Arc<T> {
    async fn players(&self) -> Result<Vec<Player>> {
        (**self).players().await
    }

    async fn player(&self, id: PlayerId) -> Result<Player> {
        (**self).player(id).await
    }

    async fn matches(&self) -> Result<Vec<MatchInfo>> {
        (**self).matches().await
    }

    async fn match_info(&self, id: MatchId) -> Result<MatchInfo> {
        (**self).match_info(id).await
    }

    async fn match_roster(&self, match_id: MatchId) -> Result<Vec<Player>> {
        (**self).match_roster(match_id).await
    }
}

#[async_trait]
impl<T: RosterAdmin + ?Sized> RosterAdmin for Arc<T> {
    async fn add_player(&self, player: NewPlayer) -> Result<Player> {
        (**self).add_player(player).await
    }

    async fn update_player(&self, id: PlayerId, patch: PlayerPatch) -> Result<Player> {
        (**self).update_player(id, patch).await
    }

    async fn set_player_active(&self, id: PlayerId, active: bool) -> Result<Player> {
        (**self).set_player_active(id, active).await
    }

    async fn remove_player(&self, id: PlayerId) -> Result<()> {
        (**self).remove_player(id).await
    }

    async fn add_match(&self, info: NewMatch) -> Result<MatchInfo> {
        (**self).add_match(info).await
    }

    async fn update_match(&self, id: MatchId, patch: MatchPatch) -> Result<MatchInfo> {
        (**self).update_match(id, patch).await
    }

    async fn set_match_status(&self, id: MatchId, status: MatchStatus) -> Result<MatchInfo> {
        (**self).set_match_status(id, status).await
    }

    async fn remove_match(&self, id: MatchId) -> Result<()> {
        (**self).remove_match(id).await
    }

    async fn add_to_roster(&self, match_id: MatchId, player_id: PlayerId) -> Result<MatchInfo> {
        (**self).add_to_roster(match_id, player_id).await
    }

    async fn remove_from_roster(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
    ) -> Result<MatchInfo> {
        (**self).remove_from_roster(match_id, player_id).await
    }

    async fn set_match_name(&self, match_id: MatchId, name: MatchPlayerName) -> Result<()> {
        (**self).set_match_name(match_id, name).await
    }
}
