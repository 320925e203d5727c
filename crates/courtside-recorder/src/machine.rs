//! Pure transition function of the stat-entry controller.
//!
//! The machine never talks to the store. A transition either settles
//! immediately or asks the caller to perform one store effect; the point
//! counter only moves once the caller reports that effect as confirmed.

use courtside_types::{
    events::{MatchId, NewEvent, PlayerId},
    metrics::Metric,
    CourtsideError, Result,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    /// Raw code awaiting a player; checked against the catalog at commit.
    MetricPending(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderState {
    pub match_id: MatchId,
    pub current_set: u32,
    pub current_point: u32,
    pub phase: Phase,
}

/// Discrete operator inputs, from a key press or a tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    SelectMetric(String),
    /// Error shortcut: selects ENF, or rotates an already pending error code.
    CycleError,
    SelectPlayer(PlayerId),
    /// 1-based roster slot from the number keys.
    SelectSlot(usize),
    Cancel,
    Timeout,
    Undo,
    NextSet,
    PreviousSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoPendingMetric,
    MetricAlreadyPending,
    SlotOutOfRange,
}

/// Store operation the caller must perform to complete a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Append(NewEvent),
    DeleteLatest(MatchId),
}

/// What settled without touching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    MetricPending(String),
    Cancelled,
    TimedOut,
    SetChanged(u32),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Settled {
        state: RecorderState,
        outcome: Settled,
    },
    /// `next` becomes current only after `effect` is confirmed by the store.
    Effect { next: RecorderState, effect: Effect },
}

impl RecorderState {
    pub fn new(match_id: MatchId) -> Self {
        Self {
            match_id,
            current_set: 1,
            current_point: 0,
            phase: Phase::Idle,
        }
    }

    pub fn pending_code(&self) -> Option<&str> {
        match &self.phase {
            Phase::Idle => None,
            Phase::MetricPending(code) => Some(code.as_str()),
        }
    }

    /// Computes the next step. An `Err` means the input was refused and the
    /// current state stays as it is, pending selection included.
    pub fn step(&self, input: Input, roster: &[PlayerId]) -> Result<Step> {
        match input {
            Input::SelectMetric(code) => Ok(match &self.phase {
                Phase::Idle => self.settle_pending(code),
                Phase::MetricPending(_) => self.ignore(IgnoreReason::MetricAlreadyPending),
            }),
            Input::CycleError => Ok(match &self.phase {
                Phase::Idle => self.settle_pending(Metric::UnforcedError.code().to_string()),
                Phase::MetricPending(code) => {
                    match Metric::from_code(code).and_then(Metric::next_error) {
                        Some(next) => self.settle_pending(next.code().to_string()),
                        None => self.ignore(IgnoreReason::MetricAlreadyPending),
                    }
                }
            }),
            Input::SelectSlot(slot) => match &self.phase {
                Phase::Idle => Ok(self.ignore(IgnoreReason::NoPendingMetric)),
                Phase::MetricPending(_) => {
                    match slot.checked_sub(1).and_then(|idx| roster.get(idx)) {
                        Some(player_id) => self.commit(*player_id, roster),
                        None => Ok(self.ignore(IgnoreReason::SlotOutOfRange)),
                    }
                }
            },
            Input::SelectPlayer(player_id) => match &self.phase {
                Phase::Idle => Ok(self.ignore(IgnoreReason::NoPendingMetric)),
                Phase::MetricPending(_) => self.commit(player_id, roster),
            },
            Input::Cancel => Ok(self.clear_pending(Settled::Cancelled)),
            Input::Timeout => Ok(self.clear_pending(Settled::TimedOut)),
            Input::Undo => Ok(Step::Effect {
                next: self.clone(),
                effect: Effect::DeleteLatest(self.match_id),
            }),
            Input::NextSet => Ok(self.with_set(self.current_set.saturating_add(1))),
            Input::PreviousSet => Ok(self.with_set(self.current_set.saturating_sub(1).max(1))),
        }
    }

    /// State after the store confirmed an append.
    pub fn after_append(&self) -> Self {
        Self {
            current_point: self.current_point.saturating_add(1),
            ..self.clone()
        }
    }

    /// State after the store confirmed an undo delete.
    pub fn after_undo(&self) -> Self {
        Self {
            current_point: self.current_point.saturating_sub(1),
            ..self.clone()
        }
    }

    /// Adopts the store's event count as the point counter.
    pub fn resynced(&self, stored_events: u32) -> Self {
        Self {
            current_point: stored_events,
            ..self.clone()
        }
    }

    fn commit(&self, player_id: PlayerId, roster: &[PlayerId]) -> Result<Step> {
        let code = self
            .pending_code()
            .ok_or_else(|| CourtsideError::validation("no metric pending"))?;
        let metric = Metric::from_code(code)
            .ok_or_else(|| CourtsideError::validation(format!("unknown metric code '{code}'")))?;
        if !roster.contains(&player_id) {
            return Err(CourtsideError::validation(format!(
                "player {player_id} is not in the match roster"
            )));
        }
        let event = NewEvent::new(
            self.match_id,
            player_id,
            self.current_set,
            self.current_point,
            metric,
        );
        Ok(Step::Effect {
            next: Self {
                phase: Phase::Idle,
                ..self.clone()
            },
            effect: Effect::Append(event),
        })
    }

    fn settle_pending(&self, code: String) -> Step {
        Step::Settled {
            state: Self {
                phase: Phase::MetricPending(code.clone()),
                ..self.clone()
            },
            outcome: Settled::MetricPending(code),
        }
    }

    fn clear_pending(&self, outcome: Settled) -> Step {
        match self.phase {
            Phase::Idle => self.ignore(IgnoreReason::NoPendingMetric),
            Phase::MetricPending(_) => Step::Settled {
                state: Self {
                    phase: Phase::Idle,
                    ..self.clone()
                },
                outcome,
            },
        }
    }

    fn with_set(&self, set: u32) -> Step {
        Step::Settled {
            state: Self {
                current_set: set,
                ..self.clone()
            },
            outcome: Settled::SetChanged(set),
        }
    }

    fn ignore(&self, reason: IgnoreReason) -> Step {
        Step::Settled {
            state: self.clone(),
            outcome: Settled::Ignored(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn settled(step: Step) -> (RecorderState, Settled) {
        match step {
            Step::Settled { state, outcome } => (state, outcome),
            Step::Effect { effect, .. } => panic!("unexpected effect {effect:?}"),
        }
    }

    fn effect(step: Step) -> (RecorderState, Effect) {
        match step {
            Step::Effect { next, effect } => (next, effect),
            Step::Settled { outcome, .. } => panic!("unexpected settle {outcome:?}"),
        }
    }

    #[test]
    fn metric_then_player_emits_one_append() {
        let ana = Uuid::new_v4();
        let state = RecorderState::new(Uuid::new_v4());

        let step = state.step(Input::SelectMetric("S".into()), &[ana]).unwrap();
        let (state, outcome) = settled(step);
        assert_eq!(outcome, Settled::MetricPending("S".into()));

        let (next, effect) = effect(state.step(Input::SelectPlayer(ana), &[ana]).unwrap());
        assert_eq!(next.phase, Phase::Idle);
        // The counter only moves on confirmation.
        assert_eq!(next.current_point, 0);
        assert_eq!(next.after_append().current_point, 1);
        match effect {
            Effect::Append(event) => {
                assert_eq!(event.metric_code, "S");
                assert_eq!(event.player_id, ana);
                assert_eq!(event.set_number, 1);
                assert_eq!(event.point_number, 0);
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn error_shortcut_cycles_in_fixed_order() {
        let mut state = RecorderState::new(Uuid::new_v4());
        let mut seen = Vec::new();
        for _ in 0..4 {
            let (next, _) = settled(state.step(Input::CycleError, &[]).unwrap());
            seen.push(next.pending_code().unwrap().to_string());
            state = next;
        }
        assert_eq!(seen, vec!["ENF", "ES", "EA", "ENF"]);
    }

    #[test]
    fn second_metric_does_not_override_pending() {
        let state = RecorderState::new(Uuid::new_v4());
        let (state, _) = settled(state.step(Input::SelectMetric("B".into()), &[]).unwrap());
        let (after, outcome) = settled(state.step(Input::SelectMetric("S".into()), &[]).unwrap());
        assert_eq!(outcome, Settled::Ignored(IgnoreReason::MetricAlreadyPending));
        assert_eq!(after.pending_code(), Some("B"));

        let (after, outcome) = settled(after.step(Input::CycleError, &[]).unwrap());
        assert_eq!(outcome, Settled::Ignored(IgnoreReason::MetricAlreadyPending));
        assert_eq!(after.pending_code(), Some("B"));
    }

    #[test]
    fn unknown_code_or_player_is_refused_and_pending_kept() {
        let ana = Uuid::new_v4();
        let state = RecorderState::new(Uuid::new_v4());
        let (bogus, _) = settled(state.step(Input::SelectMetric("XX".into()), &[ana]).unwrap());
        let err = bogus.step(Input::SelectPlayer(ana), &[ana]).unwrap_err();
        assert!(matches!(err, CourtsideError::Validation(_)));
        assert_eq!(bogus.pending_code(), Some("XX"));

        let (pending, _) = settled(state.step(Input::SelectMetric("CA".into()), &[ana]).unwrap());
        let err = pending
            .step(Input::SelectPlayer(Uuid::new_v4()), &[ana])
            .unwrap_err();
        assert!(matches!(err, CourtsideError::Validation(_)));
        assert_eq!(pending.pending_code(), Some("CA"));
    }

    #[test]
    fn slots_are_one_based_and_bounded() {
        let (ana, beto) = (Uuid::new_v4(), Uuid::new_v4());
        let roster = [ana, beto];
        let state = RecorderState::new(Uuid::new_v4());

        let (_, outcome) = settled(state.step(Input::SelectSlot(1), &roster).unwrap());
        assert_eq!(outcome, Settled::Ignored(IgnoreReason::NoPendingMetric));

        let (pending, _) = settled(state.step(Input::SelectMetric("AR".into()), &roster).unwrap());
        for slot in [0, 3] {
            let (kept, outcome) = settled(pending.step(Input::SelectSlot(slot), &roster).unwrap());
            assert_eq!(outcome, Settled::Ignored(IgnoreReason::SlotOutOfRange));
            assert_eq!(kept.pending_code(), Some("AR"));
        }
        let (_, effect) = effect(pending.step(Input::SelectSlot(2), &roster).unwrap());
        assert!(matches!(effect, Effect::Append(ref e) if e.player_id == beto));
    }

    #[test]
    fn cancel_and_timeout_discard_pending_only() {
        let state = RecorderState::new(Uuid::new_v4()).resynced(5);
        let (pending, _) = settled(state.step(Input::SelectMetric("B".into()), &[]).unwrap());

        let (idle, outcome) = settled(pending.step(Input::Cancel, &[]).unwrap());
        assert_eq!(outcome, Settled::Cancelled);
        assert_eq!(idle.phase, Phase::Idle);
        assert_eq!(idle.current_point, 5);

        let (idle, outcome) = settled(pending.step(Input::Timeout, &[]).unwrap());
        assert_eq!(outcome, Settled::TimedOut);
        assert_eq!(idle.phase, Phase::Idle);

        let (_, outcome) = settled(idle.step(Input::Cancel, &[]).unwrap());
        assert_eq!(outcome, Settled::Ignored(IgnoreReason::NoPendingMetric));
    }

    #[test]
    fn set_changes_leave_points_alone_and_floor_at_one() {
        let state = RecorderState::new(Uuid::new_v4()).resynced(7);
        let (down, outcome) = settled(state.step(Input::PreviousSet, &[]).unwrap());
        assert_eq!(outcome, Settled::SetChanged(1));
        assert_eq!(down.current_set, 1);

        let (up, _) = settled(down.step(Input::NextSet, &[]).unwrap());
        assert_eq!(up.current_set, 2);
        assert_eq!(up.current_point, 7);
    }

    #[test]
    fn undo_requests_latest_delete_from_any_phase() {
        let state = RecorderState::new(Uuid::new_v4());
        let (next, eff) = effect(state.step(Input::Undo, &[]).unwrap());
        assert_eq!(eff, Effect::DeleteLatest(state.match_id));
        assert_eq!(next, state);

        let (pending, _) = settled(state.step(Input::CycleError, &[]).unwrap());
        let (next, _) = effect(pending.step(Input::Undo, &[]).unwrap());
        assert_eq!(next.pending_code(), Some("ENF"));
        assert_eq!(RecorderState::new(state.match_id).after_undo().current_point, 0);
    }
}
