use std::collections::BTreeMap;

use courtside_types::{
    events::RecordedEvent,
    metrics::{self, MetricDefinition, Polarity},
};
use serde::Serialize;

/// Events split by polarity. Events with unknown codes land in neither side.
#[derive(Debug, Default)]
pub struct Classified<'a> {
    pub positive: Vec<&'a RecordedEvent>,
    pub negative: Vec<&'a RecordedEvent>,
}

pub fn classify<'a, I>(events: I) -> Classified<'a>
where
    I: IntoIterator<Item = &'a RecordedEvent>,
{
    let mut out = Classified::default();
    for event in events {
        match event.polarity() {
            Some(Polarity::Positive) => out.positive.push(event),
            Some(Polarity::Negative) => out.negative.push(event),
            None => {}
        }
    }
    out
}

pub fn balance<'a, I>(events: I) -> i64
where
    I: IntoIterator<Item = &'a RecordedEvent>,
{
    let split = classify(events);
    split.positive.len() as i64 - split.negative.len() as i64
}

/// Share of positive actions over all actions; `None` for an empty scope.
pub fn efficiency<'a, I>(events: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a RecordedEvent>,
{
    tally(events).efficiency()
}

/// Per-code counts. Codes absent from the input are omitted.
pub fn breakdown<'a, I>(events: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a RecordedEvent>,
{
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.metric_code.clone()).or_insert(0) += 1;
    }
    counts
}

/// Zero-filled counts in catalog order. Unknown codes are dropped.
pub fn breakdown_with_catalog(
    counts: &BTreeMap<String, usize>,
) -> Vec<(&'static MetricDefinition, usize)> {
    metrics::all()
        .iter()
        .map(|def| (def, counts.get(def.code).copied().unwrap_or(0)))
        .collect()
}

/// Single-pass summary of a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    pub unknown: usize,
    pub breakdown: BTreeMap<String, usize>,
}

impl Tally {
    pub fn balance(&self) -> i64 {
        self.positive as i64 - self.negative as i64
    }

    pub fn efficiency(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.positive as f64 / self.total as f64)
        }
    }
}

pub fn tally<'a, I>(events: I) -> Tally
where
    I: IntoIterator<Item = &'a RecordedEvent>,
{
    let mut out = Tally::default();
    for event in events {
        out.total += 1;
        match event.polarity() {
            Some(Polarity::Positive) => out.positive += 1,
            Some(Polarity::Negative) => out.negative += 1,
            None => out.unknown += 1,
        }
        *out.breakdown.entry(event.metric_code.clone()).or_insert(0) += 1;
    }
    out
}

/// Renders an efficiency for display; empty scopes show a dash instead of 0%.
pub fn format_efficiency(efficiency: Option<f64>) -> String {
    match efficiency {
        Some(ratio) => format!("{:.0}%", ratio * 100.0),
        None => "—".to_string(),
    }
}

pub fn format_balance(balance: i64) -> String {
    if balance > 0 {
        format!("+{balance}")
    } else {
        balance.to_string()
    }
}
