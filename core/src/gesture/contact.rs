//! Raw contact events and the per-contact state tracked by the gesture machine.

use crate::action::{KeyAction, KeyHit};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Opaque identity of one physical touch, stable from begin to end.
pub type ContactId = u64;

/// Screen position in points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Pressure reported by the digitizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Force {
    pub value: f32,
    pub maximum: f32,
}

impl Force {
    /// Whether this press counts as a strong (force) press at the given ratio of the maximum.
    pub fn is_strong(&self, ratio: f32) -> bool {
        self.maximum > 0.0 && self.value >= self.maximum * ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactPhase {
    Began,
    Moved,
    Ended,
    Cancelled,
}

/// One raw contact event.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEvent {
    pub id: ContactId,
    pub phase: ContactPhase,
    pub position: Point,
    pub timestamp: Instant,
    pub force: Option<Force>,
    /// Key region under the contact. Required for `Began`; optional afterwards.
    pub key: Option<KeyHit>,
}

impl ContactEvent {
    pub fn began(id: ContactId, position: Point, timestamp: Instant, key: KeyHit) -> Self {
        Self {
            id,
            phase: ContactPhase::Began,
            position,
            timestamp,
            force: None,
            key: Some(key),
        }
    }

    pub fn moved(id: ContactId, position: Point, timestamp: Instant, key: Option<KeyHit>) -> Self {
        Self {
            id,
            phase: ContactPhase::Moved,
            position,
            timestamp,
            force: None,
            key,
        }
    }

    pub fn ended(id: ContactId, position: Point, timestamp: Instant, key: Option<KeyHit>) -> Self {
        Self {
            id,
            phase: ContactPhase::Ended,
            position,
            timestamp,
            force: None,
            key,
        }
    }

    pub fn cancelled(id: ContactId, position: Point, timestamp: Instant) -> Self {
        Self {
            id,
            phase: ContactPhase::Cancelled,
            position,
            timestamp,
            force: None,
            key: None,
        }
    }

    pub fn with_force(mut self, value: f32, maximum: f32) -> Self {
        self.force = Some(Force { value, maximum });
        self
    }
}

/// Long-press overlay opened on a key.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Overlay {
    choices: Vec<String>,
    selected: usize,
    anchor_x: f32,
}

impl Overlay {
    pub(crate) fn new(choices: Vec<String>, anchor_x: f32) -> Self {
        Self {
            choices,
            selected: 0,
            anchor_x,
        }
    }

    /// Select the choice under a horizontal offset from where the overlay opened.
    pub(crate) fn select_at(&mut self, x: f32, step: f32) {
        if self.choices.is_empty() {
            return;
        }
        let offset = ((x - self.anchor_x) / step.max(f32::EPSILON)).floor();
        let last = (self.choices.len() - 1) as f32;
        self.selected = offset.clamp(0.0, last) as usize;
    }

    pub(crate) fn selected_choice(&self) -> Option<&str> {
        self.choices.get(self.selected).map(String::as_str)
    }
}

/// State of one active contact. Owned exclusively by the gesture machine.
#[derive(Debug, Clone)]
pub(crate) struct Contact {
    pub(crate) position: Point,
    pub(crate) start: Point,
    pub(crate) start_time: Instant,
    /// Key currently under the contact.
    pub(crate) key: KeyHit,
    /// Action of the key the contact began on.
    pub(crate) initial_action: KeyAction,
    /// Reference point for delta-driven cursor movement.
    pub(crate) anchor: Point,
    pub(crate) force: Option<Force>,
    /// Already produced its action (swipe delete, cursor move, key-down action).
    pub(crate) acted: bool,
    /// At least one repeat tick was emitted for this contact.
    pub(crate) repeated: bool,
    pub(crate) holding_modifier: bool,
    pub(crate) typed_while_held: bool,
    pub(crate) overlay: Option<Overlay>,
}

impl Contact {
    pub(crate) fn new(position: Point, timestamp: Instant, key: KeyHit, force: Option<Force>) -> Self {
        let initial_action = key.action.clone();
        Self {
            position,
            start: position,
            start_time: timestamp,
            key,
            initial_action,
            anchor: position,
            force,
            acted: false,
            repeated: false,
            holding_modifier: false,
            typed_while_held: false,
            overlay: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_press_needs_ratio_of_maximum() {
        let f = Force { value: 3.0, maximum: 6.0 };
        assert!(f.is_strong(0.5));
        assert!(!f.is_strong(0.6));
        assert!(!Force { value: 1.0, maximum: 0.0 }.is_strong(0.5));
    }

    #[test]
    fn overlay_selection_clamps_to_choices() {
        let mut overlay = Overlay::new(vec!["a".into(), "b".into(), "c".into()], 100.0);
        assert_eq!(overlay.selected_choice(), Some("a"));
        overlay.select_at(130.0, 24.0);
        assert_eq!(overlay.selected_choice(), Some("b"));
        overlay.select_at(500.0, 24.0);
        assert_eq!(overlay.selected_choice(), Some("c"));
        overlay.select_at(10.0, 24.0);
        assert_eq!(overlay.selected_choice(), Some("a"));
    }
}
