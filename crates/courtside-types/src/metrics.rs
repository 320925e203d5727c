//! The closed catalog of recordable in-game actions.

use serde::{Deserialize, Serialize};

/// Whether a metric counts toward the positive or the negative tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

/// Metric kinds a coach can record during a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    Serve,
    Block,
    CounterAttack,
    RotationAttack,
    ServeError,
    AttackError,
    UnforcedError,
}

/// Immutable catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDefinition {
    pub metric: Metric,
    pub code: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub polarity: Polarity,
}

pub static CATALOG: [MetricDefinition; 7] = [
    MetricDefinition {
        metric: Metric::Serve,
        code: "S",
        label: "Saque",
        description: "Punto de saque ganado",
        polarity: Polarity::Positive,
    },
    MetricDefinition {
        metric: Metric::Block,
        code: "B",
        label: "Bloqueo",
        description: "Punto de bloqueo ganado",
        polarity: Polarity::Positive,
    },
    MetricDefinition {
        metric: Metric::CounterAttack,
        code: "CA",
        label: "Contra Ataque",
        description: "Punto en contra ataque",
        polarity: Polarity::Positive,
    },
    MetricDefinition {
        metric: Metric::RotationAttack,
        code: "AR",
        label: "Ataque Rotación",
        description: "Punto en ataque de rotación",
        polarity: Polarity::Positive,
    },
    MetricDefinition {
        metric: Metric::ServeError,
        code: "ES",
        label: "Error Saque",
        description: "Error en saque",
        polarity: Polarity::Negative,
    },
    MetricDefinition {
        metric: Metric::AttackError,
        code: "EA",
        label: "Error Ataque",
        description: "Error en ataque",
        polarity: Polarity::Negative,
    },
    MetricDefinition {
        metric: Metric::UnforcedError,
        code: "ENF",
        label: "Error no Forzado",
        description: "Error no forzado en juego",
        polarity: Polarity::Negative,
    },
];

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Serve,
        Metric::Block,
        Metric::CounterAttack,
        Metric::RotationAttack,
        Metric::ServeError,
        Metric::AttackError,
        Metric::UnforcedError,
    ];

    pub fn definition(self) -> &'static MetricDefinition {
        // CATALOG rows follow the declaration order of ALL.
        &CATALOG[self as usize]
    }

    pub fn code(self) -> &'static str {
        self.definition().code
    }

    pub fn label(self) -> &'static str {
        self.definition().label
    }

    pub fn polarity(self) -> Polarity {
        self.definition().polarity
    }

    pub fn from_code(code: &str) -> Option<Metric> {
        CATALOG
            .iter()
            .find(|def| def.code == code)
            .map(|def| def.metric)
    }

    /// Rotation used by the error shortcut: ENF -> ES -> EA -> ENF.
    pub fn next_error(self) -> Option<Metric> {
        match self {
            Metric::UnforcedError => Some(Metric::ServeError),
            Metric::ServeError => Some(Metric::AttackError),
            Metric::AttackError => Some(Metric::UnforcedError),
            _ => None,
        }
    }
}

/// Looks up the polarity of a raw code. `None` means the code is outside the catalog.
pub fn polarity_of(code: &str) -> Option<Polarity> {
    Metric::from_code(code).map(Metric::polarity)
}

pub fn definition(code: &str) -> Option<&'static MetricDefinition> {
    CATALOG.iter().find(|def| def.code == code)
}

pub fn all() -> &'static [MetricDefinition] {
    &CATALOG
}

pub fn positive_codes() -> impl Iterator<Item = &'static str> {
    CATALOG
        .iter()
        .filter(|def| def.polarity == Polarity::Positive)
        .map(|def| def.code)
}

pub fn negative_codes() -> impl Iterator<Item = &'static str> {
    CATALOG
        .iter()
        .filter(|def| def.polarity == Polarity::Negative)
        .map(|def| def.code)
}
