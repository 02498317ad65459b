//! Sink for resolved gesture outcomes.

use crate::action::{KeyId, KeyboardAction};
use crate::gesture::GestureMode;

/// Visual press state changes for a key. Rendering is up to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFeedback {
    Pressed(KeyId),
    Released(KeyId),
    LongPressed(KeyId),
}

/// Receives discrete actions from the gesture machine.
///
/// Called synchronously on the event thread, at most once per resolved intent.
/// The dispatcher owns the text buffer and the composition it feeds.
pub trait ActionDispatcher {
    fn dispatch(&mut self, action: KeyboardAction);

    fn key_feedback(&mut self, _feedback: KeyFeedback) {}

    fn mode_changed(&mut self, _mode: GestureMode) {}
}

impl<D: ActionDispatcher + ?Sized> ActionDispatcher for &mut D {
    fn dispatch(&mut self, action: KeyboardAction) {
        (**self).dispatch(action)
    }

    fn key_feedback(&mut self, feedback: KeyFeedback) {
        (**self).key_feedback(feedback)
    }

    fn mode_changed(&mut self, mode: GestureMode) {
        (**self).mode_changed(mode)
    }
}

/// Dispatcher that records everything it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingDispatcher {
    pub actions: Vec<KeyboardAction>,
    pub feedback: Vec<KeyFeedback>,
    pub modes: Vec<GestureMode>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded actions.
    pub fn take_actions(&mut self) -> Vec<KeyboardAction> {
        std::mem::take(&mut self.actions)
    }

    pub fn count(&self, action: &KeyboardAction) -> usize {
        self.actions.iter().filter(|a| *a == action).count()
    }
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch(&mut self, action: KeyboardAction) {
        self.actions.push(action);
    }

    fn key_feedback(&mut self, feedback: KeyFeedback) {
        self.feedback.push(feedback);
    }

    fn mode_changed(&mut self, mode: GestureMode) {
        self.modes.push(mode);
    }
}
