use std::sync::Arc;

use async_trait::async_trait;
use courtside_types::{
    events::{EventId, MatchId, NewEvent, PlayerId, RecordedEvent, StoreChange},
    roster::{
        MatchInfo, MatchPatch, MatchPlayerName, MatchStatus, NewMatch, NewPlayer, Player,
        PlayerPatch,
    },
    Result,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{ChangeFeed, Dataset, EventStore, RosterAdmin, RosterSource, Subscription};

/// Process-local store; the default backend and the one tests run against.
#[derive(Clone)]
pub struct InMemoryStore {
    data: Arc<Mutex<Dataset>>,
    feed: ChangeFeed,
}

impl InMemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(Dataset::default())),
            feed: ChangeFeed::new(capacity),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn append(&self, event: NewEvent) -> Result<RecordedEvent> {
        let recorded = self.data.lock().await.append(event)?;
        debug!(event_id = %recorded.id, match_id = %recorded.match_id, "event appended");
        self.feed.publish(StoreChange::appended(&recorded));
        Ok(recorded)
    }

    async fn delete_by_id(&self, id: EventId) -> Result<()> {
        let removed = self.data.lock().await.remove(id)?;
        debug!(event_id = %id, match_id = %removed.match_id, "event deleted");
        self.feed.publish(StoreChange::deleted(&removed));
        Ok(())
    }

    async fn list(&self, match_id: MatchId) -> Result<Vec<RecordedEvent>> {
        Ok(self.data.lock().await.list(match_id))
    }

    async fn list_all(&self) -> Result<Vec<RecordedEvent>> {
        Ok(self.data.lock().await.list_all())
    }

    fn subscribe(&self, match_id: MatchId) -> Subscription {
        self.feed.subscribe(match_id)
    }
}

#[async_trait]
impl RosterSource for InMemoryStore {
    async fn players(&self) -> Result<Vec<Player>> {
        Ok(self.data.lock().await.players.clone())
    }

    async fn player(&self, id: PlayerId) -> Result<Player> {
        self.data.lock().await.player(id)
    }

    async fn matches(&self) -> Result<Vec<MatchInfo>> {
        Ok(self.data.lock().await.matches.clone())
    }

    async fn match_info(&self, id: MatchId) -> Result<MatchInfo> {
        self.data.lock().await.match_info(id)
    }
}

#[async_trait]
impl RosterAdmin for InMemoryStore {
    async fn add_player(&self, player: NewPlayer) -> Result<Player> {
        let player = player.into_player()?;
        self.data.lock().await.insert_player(player.clone());
        Ok(player)
    }

    async fn update_player(&self, id: PlayerId, patch: PlayerPatch) -> Result<Player> {
        self.data.lock().await.update_player(id, patch)
    }

    async fn set_player_active(&self, id: PlayerId, active: bool) -> Result<Player> {
        self.data.lock().await.set_player_active(id, active)
    }

    async fn remove_player(&self, id: PlayerId) -> Result<()> {
        self.data.lock().await.remove_player(id).map(|_| ())
    }

    async fn add_match(&self, info: NewMatch) -> Result<MatchInfo> {
        let info = info.into_match()?;
        self.data.lock().await.insert_match(info.clone())?;
        Ok(info)
    }

    async fn update_match(&self, id: MatchId, patch: MatchPatch) -> Result<MatchInfo> {
        self.data.lock().await.update_match(id, patch)
    }

    async fn set_match_status(&self, id: MatchId, status: MatchStatus) -> Result<MatchInfo> {
        self.data.lock().await.set_match_status(id, status)
    }

    async fn remove_match(&self, id: MatchId) -> Result<()> {
        let removed = self.data.lock().await.remove_match(id)?;
        debug!(match_id = %id, events = removed.len(), "match removed");
        for event in &removed {
            self.feed.publish(StoreChange::deleted(event));
        }
        Ok(())
    }

    async fn add_to_roster(&self, match_id: MatchId, player_id: PlayerId) -> Result<MatchInfo> {
        self.data.lock().await.add_to_roster(match_id, player_id)
    }

    async fn remove_from_roster(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
    ) -> Result<MatchInfo> {
        self.data.lock().await.remove_from_roster(match_id, player_id)
    }

    async fn set_match_name(&self, match_id: MatchId, name: MatchPlayerName) -> Result<()> {
        self.data.lock().await.set_match_name(match_id, name)
    }
}
