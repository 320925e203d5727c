use std::collections::HashSet;

use courtside_types::{
    events::{PlayerId, RecordedEvent},
    metrics::MetricDefinition,
};
use serde::{Deserialize, Serialize};

use crate::balance::{breakdown, breakdown_with_catalog, classify};

/// Optional narrowing applied before aggregation. Empty fields mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub player_id: Option<PlayerId>,
    pub metric_code: Option<String>,
    pub set_number: Option<u32>,
}

impl EventFilter {
    pub fn matches(&self, event: &RecordedEvent) -> bool {
        if matches!(self.player_id, Some(id) if id != event.player_id) {
            return false;
        }
        if matches!(&self.metric_code, Some(code) if *code != event.metric_code) {
            return false;
        }
        if matches!(self.set_number, Some(set) if set != event.set_number) {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, events: &'a [RecordedEvent]) -> Vec<&'a RecordedEvent> {
        events.iter().filter(|event| self.matches(event)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.player_id.is_none() && self.metric_code.is_none() && self.set_number.is_none()
    }
}

/// Team-wide counts per catalog metric, zero-filled.
pub fn metric_totals(events: &[RecordedEvent]) -> Vec<(&'static MetricDefinition, usize)> {
    breakdown_with_catalog(&breakdown(events))
}

/// Header numbers of the match detail screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchTotals {
    pub total_actions: usize,
    pub active_players: usize,
    pub positive_actions: usize,
    pub negative_actions: usize,
}

pub fn match_totals(events: &[RecordedEvent], roster: &[PlayerId]) -> MatchTotals {
    let split = classify(events);
    let active_players = roster.iter().collect::<HashSet<_>>().len();
    MatchTotals {
        total_actions: events.len(),
        active_players,
        positive_actions: split.positive.len(),
        negative_actions: split.negative.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::event;
    use uuid::Uuid;

    #[test]
    fn filter_combines_all_fields() {
        let m = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut second_set = event(m, a, "B", 2);
        second_set.set_number = 2;
        let events = vec![event(m, a, "B", 0), event(m, b, "B", 1), second_set];

        assert_eq!(EventFilter::default().apply(&events).len(), 3);
        assert!(EventFilter::default().is_empty());

        let by_player = EventFilter {
            player_id: Some(a),
            ..Default::default()
        };
        assert_eq!(by_player.apply(&events).len(), 2);

        let by_player_and_set = EventFilter {
            player_id: Some(a),
            set_number: Some(2),
            ..Default::default()
        };
        assert_eq!(by_player_and_set.apply(&events).len(), 1);

        let by_metric = EventFilter {
            metric_code: Some("S".into()),
            ..Default::default()
        };
        assert!(by_metric.apply(&events).is_empty());
    }

    #[test]
    fn totals_count_polarity_and_roster() {
        let m = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let events = vec![
            event(m, a, "S", 0),
            event(m, a, "EA", 1),
            event(m, b, "CA", 2),
            event(m, b, "??", 3),
        ];
        let totals = match_totals(&events, &[a, b, a]);
        assert_eq!(
            totals,
            MatchTotals {
                total_actions: 4,
                active_players: 2,
                positive_actions: 2,
                negative_actions: 1,
            }
        );

        let per_metric = metric_totals(&events);
        assert_eq!(per_metric.len(), 7);
        assert_eq!(per_metric.iter().map(|(_, n)| n).sum::<usize>(), 3);
    }
}
