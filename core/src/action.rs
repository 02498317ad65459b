//! Key caps and the discrete actions produced by the gesture machine.
//!
//! This module provides:
//! - `KeyAction`: what a key does when it is the target of a contact
//! - `KeyHit`: a key region resolved under a contact position
//! - `KeyboardAction`: the discrete actions handed to the `ActionDispatcher`

use serde::{Deserialize, Serialize};

/// Shift state shown by a shift key at the moment it is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftState {
    Lowercased,
    Uppercased,
    CapsLocked,
}

/// Keyboard layout families a key can switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyboardType {
    Alphabetic(ShiftState),
    Numeric,
    Symbolic,
    Emojis,
}

/// Action bound to a key cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAction {
    Character(String),
    Space,
    NewLine,
    Backspace,
    Shift(ShiftState),
    NextKeyboard,
    KeyboardType(KeyboardType),
    None,
}

impl KeyAction {
    pub fn is_shift(&self) -> bool {
        matches!(self, KeyAction::Shift(_))
    }

    pub fn is_character(&self) -> bool {
        matches!(self, KeyAction::Character(_))
    }
}

/// Opaque key region identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(pub u32);

/// A key region hit by a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHit {
    pub key: KeyId,
    pub action: KeyAction,
    /// Characters offered in the long-press overlay, empty if the key has none.
    #[serde(default)]
    pub long_press_choices: Vec<String>,
}

impl KeyHit {
    pub fn new(key: u32, action: KeyAction) -> Self {
        Self {
            key: KeyId(key),
            action,
            long_press_choices: Vec::new(),
        }
    }

    /// Attach long-press overlay choices.
    pub fn with_long_press<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.long_press_choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn supports_long_press(&self) -> bool {
        !self.long_press_choices.is_empty()
    }
}

/// Discrete editing action resolved from one user intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyboardAction {
    Character(String),
    Space,
    NewLine,
    Backspace,
    DeleteWord,
    DeleteWordSwipe,
    MoveCursorBackward,
    MoveCursorForward,
    MoveCursorEnded,
    ShiftDown,
    ShiftUp,
    ShiftRelax,
    CapsLock,
    KeyboardType(KeyboardType),
    NextKeyboard,
    /// Typing is enabled or disabled because the composition backend changed readiness.
    EnableKeyboard(bool),
}

impl KeyboardAction {
    /// Action emitted when a tap on `action` is committed, if any.
    pub fn from_tap(action: &KeyAction) -> Option<Self> {
        match action {
            KeyAction::Character(c) => Some(KeyboardAction::Character(c.clone())),
            KeyAction::Space => Some(KeyboardAction::Space),
            KeyAction::NewLine => Some(KeyboardAction::NewLine),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_actions_only_for_text_keys() {
        assert_eq!(
            KeyboardAction::from_tap(&KeyAction::Character("a".into())),
            Some(KeyboardAction::Character("a".into()))
        );
        assert_eq!(KeyboardAction::from_tap(&KeyAction::Space), Some(KeyboardAction::Space));
        assert_eq!(KeyboardAction::from_tap(&KeyAction::Backspace), None);
        assert_eq!(KeyboardAction::from_tap(&KeyAction::Shift(ShiftState::Lowercased)), None);
    }

    #[test]
    fn key_hit_long_press_choices() {
        let hit = KeyHit::new(3, KeyAction::Character("e".into())).with_long_press(["é", "è"]);
        assert!(hit.supports_long_press());
        assert_eq!(hit.long_press_choices, vec!["é".to_string(), "è".to_string()]);
        assert!(!KeyHit::new(4, KeyAction::Space).supports_long_press());
    }
}
