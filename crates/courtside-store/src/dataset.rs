use courtside_types::{
    events::{EventId, MatchId, NewEvent, PlayerId, RecordedEvent},
    roster::{MatchInfo, MatchPatch, MatchPlayerName, MatchStatus, Player, PlayerPatch},
    CourtsideError, Result,
};
use serde::{Deserialize, Serialize};

/// Everything a store holds. Serialized as-is by the json backend.
///
/// `events` is kept in commit order; listings never re-sort it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub matches: Vec<MatchInfo>,
    #[serde(default)]
    pub events: Vec<RecordedEvent>,
}

impl Dataset {
    pub fn append(&mut self, event: NewEvent) -> Result<RecordedEvent> {
        event.validate()?;
        let recorded = event.into_recorded();
        self.events.push(recorded.clone());
        Ok(recorded)
    }

    pub fn remove(&mut self, id: EventId) -> Result<RecordedEvent> {
        let idx = self
            .events
            .iter()
            .position(|event| event.id == id)
            .ok_or_else(|| CourtsideError::NotFound(format!("event {id}")))?;
        Ok(self.events.remove(idx))
    }

    /// Events of one match in commit order.
    pub fn list(&self, match_id: MatchId) -> Vec<RecordedEvent> {
        self.events
            .iter()
            .filter(|event| event.match_id == match_id)
            .cloned()
            .collect()
    }

    pub fn list_all(&self) -> Vec<RecordedEvent> {
        self.events.clone()
    }

    pub fn player(&self, id: PlayerId) -> Result<Player> {
        self.players
            .iter()
            .find(|player| player.id == id)
            .cloned()
            .ok_or_else(|| CourtsideError::NotFound(format!("player {id}")))
    }

    pub fn match_info(&self, id: MatchId) -> Result<MatchInfo> {
        self.matches
            .iter()
            .find(|info| info.id == id)
            .cloned()
            .ok_or_else(|| CourtsideError::NotFound(format!("match {id}")))
    }

    pub fn insert_player(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn update_player(&mut self, id: PlayerId, patch: PlayerPatch) -> Result<Player> {
        let slot = self.player_mut(id)?;
        let updated = patch.apply(slot)?;
        *slot = updated.clone();
        Ok(updated)
    }

    pub fn set_player_active(&mut self, id: PlayerId, active: bool) -> Result<Player> {
        let slot = self.player_mut(id)?;
        slot.active = active;
        Ok(slot.clone())
    }

    /// Deletes a player with no recorded actions and drops them from every match.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Player> {
        let idx = self
            .players
            .iter()
            .position(|player| player.id == id)
            .ok_or_else(|| CourtsideError::NotFound(format!("player {id}")))?;
        let recorded = self.events.iter().filter(|e| e.player_id == id).count();
        if recorded > 0 {
            return Err(CourtsideError::validation(format!(
                "player {id} has {recorded} recorded actions; deactivate instead"
            )));
        }
        for info in &mut self.matches {
            info.roster.retain(|player_id| *player_id != id);
            info.player_names.retain(|entry| entry.player_id != id);
        }
        Ok(self.players.remove(idx))
    }

    pub fn insert_match(&mut self, info: MatchInfo) -> Result<()> {
        for player_id in &info.roster {
            self.player(*player_id)?;
        }
        self.matches.push(info);
        Ok(())
    }

    pub fn update_match(&mut self, id: MatchId, patch: MatchPatch) -> Result<MatchInfo> {
        let slot = self.match_mut(id)?;
        let updated = patch.apply(slot)?;
        *slot = updated.clone();
        Ok(updated)
    }

    pub fn set_match_status(&mut self, id: MatchId, status: MatchStatus) -> Result<MatchInfo> {
        let slot = self.match_mut(id)?;
        slot.status = status;
        Ok(slot.clone())
    }

    /// Deletes a match together with its events; returns the removed events.
    pub fn remove_match(&mut self, id: MatchId) -> Result<Vec<RecordedEvent>> {
        let idx = self
            .matches
            .iter()
            .position(|info| info.id == id)
            .ok_or_else(|| CourtsideError::NotFound(format!("match {id}")))?;
        self.matches.remove(idx);
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.events)
            .into_iter()
            .partition(|event| event.match_id == id);
        self.events = kept;
        Ok(removed)
    }

    /// Calls a player up for a match; already called-up players keep their slot.
    pub fn add_to_roster(&mut self, match_id: MatchId, player_id: PlayerId) -> Result<MatchInfo> {
        self.player(player_id)?;
        let info = self.match_mut(match_id)?;
        if !info.roster.contains(&player_id) {
            info.roster.push(player_id);
        }
        Ok(info.clone())
    }

    pub fn remove_from_roster(
        &mut self,
        match_id: MatchId,
        player_id: PlayerId,
    ) -> Result<MatchInfo> {
        let info = self.match_mut(match_id)?;
        let before = info.roster.len();
        info.roster.retain(|id| *id != player_id);
        if info.roster.len() == before {
            return Err(CourtsideError::NotFound(format!(
                "player {player_id} in match {match_id}"
            )));
        }
        Ok(info.clone())
    }

    pub fn set_match_name(&mut self, match_id: MatchId, name: MatchPlayerName) -> Result<()> {
        let info = self.match_mut(match_id)?;
        info.player_names.retain(|entry| entry.player_id != name.player_id);
        info.player_names.push(name);
        Ok(())
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players
            .iter_mut()
            .find(|player| player.id == id)
            .ok_or_else(|| CourtsideError::NotFound(format!("player {id}")))
    }

    fn match_mut(&mut self, id: MatchId) -> Result<&mut MatchInfo> {
        self.matches
            .iter_mut()
            .find(|info| info.id == id)
            .ok_or_else(|| CourtsideError::NotFound(format!("match {id}")))
    }
}
