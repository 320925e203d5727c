//! Stat-entry controller: turns operator inputs into committed match events.

use courtside_store::{EventStore, Subscription};
use courtside_types::{
    config::RecorderConfig,
    events::{ChangeKind, MatchId, PlayerId, RecordedEvent, StoreChange},
    CourtsideError, Result,
};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod keymap;
pub mod machine;

pub use keymap::{input_for_key, Key, PadKeys, KEY_HELP};
pub use machine::{Effect, IgnoreReason, Input, Phase, RecorderState, Settled, Step};

/// Result of one handled input after any store effect completed.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Settled(Settled),
    Committed(RecordedEvent),
    Undone(RecordedEvent),
    NothingToUndo,
}

/// Point counter before and after adopting the store's count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub local: u32,
    pub stored: u32,
}

impl SyncReport {
    pub fn drifted(&self) -> bool {
        self.local != self.stored
    }
}

/// Drives a [`RecorderState`] against an event store for one match.
pub struct Recorder<S>
where
    S: EventStore,
{
    store: S,
    state: RecorderState,
    roster: Vec<PlayerId>,
    pending_timeout: Duration,
    pending_deadline: Option<Instant>,
}

impl<S> Recorder<S>
where
    S: EventStore,
{
    /// Opens a session with the point counter taken from the stored events.
    pub async fn open(
        store: S,
        match_id: MatchId,
        roster: Vec<PlayerId>,
        config: &RecorderConfig,
    ) -> Result<Self> {
        let mut recorder = Self {
            store,
            state: RecorderState::new(match_id),
            roster,
            pending_timeout: Duration::from_millis(config.pending_timeout_ms),
            pending_deadline: None,
        };
        let stored = recorder.stored_count().await?;
        recorder.state = recorder.state.resynced(stored);
        info!(
            %match_id,
            point = recorder.state.current_point,
            players = recorder.roster.len(),
            "Recorder session opened"
        );
        Ok(recorder)
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    pub fn roster(&self) -> &[PlayerId] {
        &self.roster
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending_deadline
    }

    pub fn subscribe(&self) -> Subscription {
        self.store.subscribe(self.state.match_id)
    }

    /// Applies one input. On `Err` the state is exactly what it was before.
    pub async fn handle(&mut self, input: Input) -> Result<Outcome> {
        let step = self.state.step(input, &self.roster)?;
        match step {
            Step::Settled { state, outcome } => {
                self.adopt(state);
                debug!(?outcome, "input settled");
                Ok(Outcome::Settled(outcome))
            }
            Step::Effect { next, effect } => self.apply_effect(next, effect).await,
        }
    }

    /// Fires the pending-selection timeout if its deadline has passed.
    pub fn expire_pending(&mut self, now: Instant) -> Option<Settled> {
        let deadline = self.pending_deadline?;
        if now < deadline {
            return None;
        }
        match self.state.step(Input::Timeout, &self.roster) {
            Ok(Step::Settled { state, outcome }) => {
                self.adopt(state);
                Some(outcome)
            }
            _ => None,
        }
    }

    /// Re-lists the match and adopts the stored count as the point counter.
    pub async fn resync(&mut self) -> Result<SyncReport> {
        let stored = self.stored_count().await?;
        let report = SyncReport {
            local: self.state.current_point,
            stored,
        };
        if report.drifted() {
            warn!(
                match_id = %self.state.match_id,
                local = report.local,
                stored = report.stored,
                "point counter drifted; adopting store count"
            );
        }
        self.state = self.state.resynced(stored);
        Ok(report)
    }

    /// Reacts to a change notification by recomputing from the store.
    pub async fn on_change(&mut self, change: StoreChange) -> Result<SyncReport> {
        if change.match_id != self.state.match_id {
            return Ok(SyncReport {
                local: self.state.current_point,
                stored: self.state.current_point,
            });
        }
        if let ChangeKind::Lagged(missed) = change.kind {
            debug!(missed, "resyncing after lagged change feed");
        }
        self.resync().await
    }

    /// Fails with [`CourtsideError::ConcurrentDrift`] when the counter disagrees with the store.
    pub async fn ensure_in_sync(&self) -> Result<()> {
        let stored = self.stored_count().await?;
        if stored != self.state.current_point {
            return Err(CourtsideError::ConcurrentDrift {
                local: self.state.current_point,
                stored,
            });
        }
        Ok(())
    }

    pub async fn events(&self) -> Result<Vec<RecordedEvent>> {
        self.store.list(self.state.match_id).await
    }

    async fn apply_effect(&mut self, next: RecorderState, effect: Effect) -> Result<Outcome> {
        match effect {
            Effect::Append(event) => {
                let recorded = self.store.append(event).await.map_err(|err| {
                    warn!("append failed; counters unchanged: {err}");
                    err
                })?;
                info!(
                    event_id = %recorded.id,
                    metric = %recorded.metric_code,
                    set = recorded.set_number,
                    point = recorded.point_number,
                    "event committed"
                );
                self.adopt(next.after_append());
                Ok(Outcome::Committed(recorded))
            }
            Effect::DeleteLatest(match_id) => {
                let events = self.store.list(match_id).await?;
                let Some(latest) = events.last().cloned() else {
                    debug!(%match_id, "undo with no events; nothing to do");
                    return Ok(Outcome::NothingToUndo);
                };
                match self.store.delete_by_id(latest.id).await {
                    Ok(()) => {
                        info!(event_id = %latest.id, "event undone");
                        self.adopt(next.after_undo());
                        Ok(Outcome::Undone(latest))
                    }
                    Err(CourtsideError::NotFound(_)) => {
                        // Another writer removed it first.
                        self.resync().await?;
                        Ok(Outcome::NothingToUndo)
                    }
                    Err(err) => {
                        warn!("undo failed; counters unchanged: {err}");
                        Err(err)
                    }
                }
            }
        }
    }

    async fn stored_count(&self) -> Result<u32> {
        let events = self.store.list(self.state.match_id).await?;
        u32::try_from(events.len())
            .map_err(|_| CourtsideError::validation("event count exceeds point counter range"))
    }

    fn adopt(&mut self, state: RecorderState) {
        let was = self.state.pending_code().map(str::to_owned);
        let now = state.pending_code().map(str::to_owned);
        self.pending_deadline = match (&was, &now) {
            (_, None) => None,
            (Some(a), Some(b)) if a == b => self.pending_deadline,
            (_, Some(_)) => Some(Instant::now() + self.pending_timeout),
        };
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courtside_store::InMemoryStore;
    use courtside_types::events::{EventId, NewEvent};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };
    use uuid::Uuid;

    /// In-memory store whose writes can be switched off.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: InMemoryStore,
        down: Arc<AtomicBool>,
    }

    impl FlakyStore {
        fn set_down(&self, down: bool) {
            self.down.store(down, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.down.load(Ordering::SeqCst) {
                Err(CourtsideError::store("backend offline"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl EventStore for FlakyStore {
        async fn append(&self, event: NewEvent) -> Result<RecordedEvent> {
            self.check()?;
            self.inner.append(event).await
        }

        async fn delete_by_id(&self, id: EventId) -> Result<()> {
            self.check()?;
            self.inner.delete_by_id(id).await
        }

        async fn list(&self, match_id: MatchId) -> Result<Vec<RecordedEvent>> {
            self.inner.list(match_id).await
        }

        async fn list_all(&self) -> Result<Vec<RecordedEvent>> {
            self.inner.list_all().await
        }

        fn subscribe(&self, match_id: MatchId) -> Subscription {
            self.inner.subscribe(match_id)
        }
    }

    fn config() -> RecorderConfig {
        RecorderConfig {
            pending_timeout_ms: 1_000,
            shortcut_slots: 9,
        }
    }

    async fn session(roster: Vec<PlayerId>) -> Recorder<FlakyStore> {
        Recorder::open(FlakyStore::default(), Uuid::new_v4(), roster, &config())
            .await
            .expect("open recorder")
    }

    #[tokio::test]
    async fn serve_then_player_commits_one_event() {
        let ana = Uuid::new_v4();
        let mut recorder = session(vec![ana]).await;

        recorder
            .handle(Input::SelectMetric("S".into()))
            .await
            .expect("select metric");
        let outcome = recorder.handle(Input::SelectSlot(1)).await.expect("commit");

        let events = recorder.events().await.expect("list");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].metric_code, "S");
        assert_eq!(events[0].player_id, ana);
        assert_eq!(outcome, Outcome::Committed(events[0].clone()));
        assert_eq!(recorder.state().current_point, 1);
        assert_eq!(recorder.state().phase, Phase::Idle);
        recorder.ensure_in_sync().await.expect("in sync");
    }

    #[tokio::test]
    async fn undo_restores_count_and_is_noop_when_empty() {
        let ana = Uuid::new_v4();
        let mut recorder = session(vec![ana]).await;

        assert_eq!(
            recorder.handle(Input::Undo).await.expect("undo"),
            Outcome::NothingToUndo
        );
        assert_eq!(recorder.state().current_point, 0);

        recorder.handle(Input::SelectMetric("B".into())).await.unwrap();
        recorder.handle(Input::SelectPlayer(ana)).await.unwrap();
        recorder.handle(Input::CycleError).await.unwrap();
        recorder.handle(Input::SelectPlayer(ana)).await.unwrap();
        assert_eq!(recorder.events().await.unwrap().len(), 2);

        match recorder.handle(Input::Undo).await.expect("undo") {
            Outcome::Undone(event) => assert_eq!(event.metric_code, "ENF"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(recorder.events().await.unwrap().len(), 1);
        assert_eq!(recorder.state().current_point, 1);

        recorder.handle(Input::Undo).await.unwrap();
        assert_eq!(
            recorder.handle(Input::Undo).await.unwrap(),
            Outcome::NothingToUndo
        );
        assert_eq!(recorder.state().current_point, 0);
    }

    #[tokio::test]
    async fn full_match_roster_is_selectable() {
        let roster: Vec<PlayerId> = (0..12).map(|_| Uuid::new_v4()).collect();
        let mut recorder = session(roster.clone()).await;
        assert_eq!(recorder.roster().len(), 12);

        let mut pad = PadKeys::new(config().shortcut_slots);
        recorder.handle(Input::SelectMetric("AR".into())).await.unwrap();
        pad.resolve(Key::Up, recorder.roster());
        let input = pad.resolve(Key::Enter, recorder.roster()).expect("cursor pick");
        recorder.handle(input).await.expect("commit for the twelfth player");

        recorder.handle(Input::SelectMetric("S".into())).await.unwrap();
        recorder
            .handle(Input::SelectPlayer(roster[10]))
            .await
            .expect("commit for the eleventh player");

        let players: Vec<_> = recorder
            .events()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.player_id)
            .collect();
        assert_eq!(players, vec![roster[11], roster[10]]);
        assert_eq!(recorder.state().current_point, 2);
    }

    #[tokio::test]
    async fn store_failure_keeps_counters_and_pending() {
        let ana = Uuid::new_v4();
        let mut recorder = session(vec![ana]).await;
        recorder.handle(Input::SelectMetric("CA".into())).await.unwrap();

        recorder.store().set_down(true);
        let err = recorder.handle(Input::SelectPlayer(ana)).await.unwrap_err();
        assert!(matches!(err, CourtsideError::StoreUnavailable(_)));
        assert_eq!(recorder.state().current_point, 0);
        assert_eq!(recorder.state().pending_code(), Some("CA"));

        recorder.store().set_down(false);
        recorder.handle(Input::SelectPlayer(ana)).await.expect("retry");
        assert_eq!(recorder.state().current_point, 1);

        recorder.store().set_down(true);
        assert!(recorder.handle(Input::Undo).await.is_err());
        assert_eq!(recorder.state().current_point, 1);
        assert_eq!(recorder.events().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn validation_error_creates_nothing() {
        let ana = Uuid::new_v4();
        let mut recorder = session(vec![ana]).await;
        recorder.handle(Input::SelectMetric("S".into())).await.unwrap();
        let err = recorder
            .handle(Input::SelectPlayer(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(recorder.events().await.unwrap().is_empty());
        assert_eq!(recorder.state().pending_code(), Some("S"));
    }

    #[tokio::test]
    async fn remote_writes_are_adopted_on_change() {
        let ana = Uuid::new_v4();
        let mut recorder = session(vec![ana]).await;
        let mut sub = recorder.subscribe();
        let match_id = recorder.state().match_id;

        // A second device records two actions on the same match.
        let remote = recorder.store().clone();
        for point in 0..2 {
            remote
                .append(NewEvent::new(
                    match_id,
                    ana,
                    1,
                    point,
                    courtside_types::metrics::Metric::Block,
                ))
                .await
                .unwrap();
        }
        let err = recorder.ensure_in_sync().await.unwrap_err();
        assert!(matches!(
            err,
            CourtsideError::ConcurrentDrift { local: 0, stored: 2 }
        ));

        let change = sub.next().await.expect("notification");
        let report = recorder.on_change(change).await.expect("resync");
        assert!(report.drifted());
        assert_eq!(recorder.state().current_point, 2);
        recorder.ensure_in_sync().await.expect("in sync");
    }

    #[tokio::test]
    async fn pending_selection_expires_after_deadline() {
        let mut recorder = session(vec![Uuid::new_v4()]).await;
        assert!(recorder.pending_deadline().is_none());

        recorder.handle(Input::CycleError).await.unwrap();
        let deadline = recorder.pending_deadline().expect("deadline armed");
        assert!(recorder.expire_pending(deadline - Duration::from_millis(1)).is_none());

        // Cycling to another error code re-arms the deadline.
        recorder.handle(Input::CycleError).await.unwrap();
        let rearmed = recorder.pending_deadline().expect("deadline");
        assert!(rearmed >= deadline);

        assert_eq!(recorder.expire_pending(rearmed), Some(Settled::TimedOut));
        assert_eq!(recorder.state().phase, Phase::Idle);
        assert!(recorder.pending_deadline().is_none());
        assert!(recorder.events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_changes_stamp_later_events() {
        let ana = Uuid::new_v4();
        let mut recorder = session(vec![ana]).await;
        recorder.handle(Input::NextSet).await.unwrap();
        recorder.handle(Input::NextSet).await.unwrap();
        recorder.handle(Input::SelectMetric("AR".into())).await.unwrap();
        recorder.handle(Input::SelectSlot(1)).await.unwrap();
        let events = recorder.events().await.unwrap();
        assert_eq!(events[0].set_number, 3);
        assert_eq!(recorder.state().current_point, 1);
    }
}
