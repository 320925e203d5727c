use courtside_types::{events::PlayerId, metrics::Metric};

use crate::machine::Input;

/// Frontend-neutral key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Esc,
    Up,
    Down,
    Enter,
}

/// Keyboard shortcuts of the recorder pad. Letters are case-insensitive.
pub fn input_for_key(key: Key) -> Option<Input> {
    match key {
        Key::Backspace => Some(Input::Undo),
        Key::Esc => Some(Input::Cancel),
        Key::Up | Key::Down | Key::Enter => None,
        Key::Char(c) => match c.to_ascii_uppercase() {
            'S' => Some(metric(Metric::Serve)),
            'B' => Some(metric(Metric::Block)),
            'C' => Some(metric(Metric::CounterAttack)),
            'A' => Some(metric(Metric::RotationAttack)),
            'E' => Some(Input::CycleError),
            '+' | '=' => Some(Input::NextSet),
            '-' => Some(Input::PreviousSet),
            d @ '1'..='9' => d.to_digit(10).map(|n| Input::SelectSlot(n as usize)),
            _ => None,
        },
    }
}

fn metric(metric: Metric) -> Input {
    Input::SelectMetric(metric.code().to_string())
}

/// Pad keys for a roster of any size: digits are shortcuts for the first
/// `shortcut_slots` players, the arrows move a cursor over the whole roster
/// and Enter selects the player under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadKeys {
    cursor: usize,
    shortcut_slots: u8,
}

impl PadKeys {
    pub fn new(shortcut_slots: u8) -> Self {
        Self {
            cursor: 0,
            shortcut_slots: shortcut_slots.min(9),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn resolve(&mut self, key: Key, roster: &[PlayerId]) -> Option<Input> {
        if roster.is_empty() {
            self.cursor = 0;
        } else {
            self.cursor = self.cursor.min(roster.len() - 1);
        }
        match key {
            Key::Up => {
                if !roster.is_empty() {
                    self.cursor = self.cursor.checked_sub(1).unwrap_or(roster.len() - 1);
                }
                None
            }
            Key::Down => {
                if !roster.is_empty() {
                    self.cursor = (self.cursor + 1) % roster.len();
                }
                None
            }
            Key::Enter => roster.get(self.cursor).copied().map(Input::SelectPlayer),
            Key::Char(d @ '1'..='9') if d as u8 - b'0' > self.shortcut_slots => None,
            other => input_for_key(other),
        }
    }
}

/// Help line shown under the pad.
pub const KEY_HELP: &str = "S saque  B bloqueo  C contra ataque  A ataque rotación  \
     E error (x3 cicla)  1-9 jugador  ↑↓ Enter elegir  ⌫ deshacer  Esc cancelar  +/- set";
