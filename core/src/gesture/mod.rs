//! Multi-contact gesture state machine.
//!
//! Raw contact events go in, discrete `KeyboardAction`s come out through the
//! injected `ActionDispatcher`. One `GestureMode` is active at a time and all
//! contacts are interpreted under it:
//!
//! - `Typing`: taps resolve on key-up; space drags and force drags on
//!   characters enter `CursorMoving`; held keys may open a long-press overlay
//! - `Backspacing`: the delete key repeats on a timer, a leftward swipe deletes
//!   one word instead
//! - `CursorMoving`: horizontal displacement becomes cursor steps
//! - `NextKeyboardHandoff`: the globe key owns the contact until release
//!
//! Time-driven transitions run off logical timers. Before an event is applied,
//! every timer due at or before its timestamp fires, so outcomes depend only on
//! event order and timestamps.

mod contact;
mod timer;

pub use contact::{ContactEvent, ContactId, ContactPhase, Force, Point};
pub use timer::{TimerHandle, TimerKind};

use crate::action::{KeyAction, KeyboardAction, ShiftState};
use crate::dispatcher::{ActionDispatcher, KeyFeedback};
use crate::{Config, DeviceIdiom};
use ahash::AHashMap;
use contact::{Contact, Overlay};
use std::collections::VecDeque;
use std::time::Instant;
use timer::TimerSlots;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureMode {
    #[default]
    Typing,
    Backspacing,
    CursorMoving,
    NextKeyboardHandoff,
}

/// Resolves concurrent touch streams into discrete keyboard actions.
pub struct GestureMachine<D: ActionDispatcher> {
    config: Config,
    dispatcher: D,
    contacts: AHashMap<ContactId, Contact>,
    /// Active contacts, oldest first.
    queue: VecDeque<ContactId>,
    mode: GestureMode,
    /// Contact that put the machine into a non-typing mode.
    mode_owner: Option<ContactId>,
    timers: TimerSlots,
    last_shift_tap: Option<Instant>,
    enabled: bool,
}

impl<D: ActionDispatcher> GestureMachine<D> {
    pub fn new(config: Config, dispatcher: D) -> Self {
        Self {
            config,
            dispatcher,
            contacts: AHashMap::new(),
            queue: VecDeque::new(),
            mode: GestureMode::Typing,
            mode_owner: None,
            timers: TimerSlots::new(),
            last_shift_tap: None,
            enabled: true,
        }
    }

    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of tracked contacts.
    pub fn active_contacts(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn into_dispatcher(self) -> D {
        self.dispatcher
    }

    /// Earliest pending timer deadline, for hosts that schedule wake-ups.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Handle of the currently scheduled timer of `kind`, if any.
    pub fn pending_timer(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.timers.current(kind)
    }

    /// Enable or disable typing, e.g. while the composition backend is not ready.
    ///
    /// Disabling cancels every active contact; new contacts are ignored until
    /// typing is enabled again.
    pub fn set_enabled(&mut self, enabled: bool, now: Instant) {
        if self.enabled == enabled {
            return;
        }
        debug!(enabled, "keyboard readiness changed");
        if !enabled {
            let ids: Vec<ContactId> = self.queue.iter().copied().collect();
            for id in ids {
                self.finish(id, now, true);
            }
            self.timers.cancel_all();
        }
        self.enabled = enabled;
        self.dispatcher
            .dispatch(KeyboardAction::EnableKeyboard(enabled));
    }

    /// Apply one raw contact event.
    pub fn handle_event(&mut self, event: ContactEvent) {
        self.poll(event.timestamp);
        match event.phase {
            ContactPhase::Began => self.began(event),
            ContactPhase::Moved => self.moved(event),
            ContactPhase::Ended => self.ended(event, false),
            ContactPhase::Cancelled => self.ended(event, true),
        }
    }

    /// Fire every timer due at or before `now`. Returns how many firings ran.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while let Some(handle) = self.timers.next_due(now) {
            self.fire(handle, now);
            fired += 1;
        }
        fired
    }

    /// Deliver a firing of `handle`. Stale handles are ignored and return false.
    pub fn fire(&mut self, handle: TimerHandle, now: Instant) -> bool {
        if !self.timers.is_current(handle) {
            trace!(?handle, "ignoring stale timer");
            return false;
        }
        let Some((owner, tick)) = self.timers.advance(handle) else {
            return false;
        };
        match handle.kind {
            TimerKind::Repeat => self.on_repeat(owner, tick),
            TimerKind::LongPress => self.on_long_press(owner, now),
        }
    }

    fn on_repeat(&mut self, owner: ContactId, tick: u32) -> bool {
        let valid = self.mode == GestureMode::Backspacing && self.mode_owner == Some(owner);
        let Some(contact) = self.contacts.get_mut(&owner).filter(|c| valid && !c.acted) else {
            self.timers.cancel_kind_owned_by(TimerKind::Repeat, owner);
            return false;
        };
        contact.repeated = true;
        let action = if tick <= self.config.backspace_repeats_before_word_delete {
            KeyboardAction::Backspace
        } else {
            KeyboardAction::DeleteWord
        };
        trace!(tick, ?action, "key repeat");
        self.dispatcher.dispatch(action);
        true
    }

    fn on_long_press(&mut self, owner: ContactId, now: Instant) -> bool {
        if self.mode != GestureMode::Typing {
            return false;
        }
        let Some(contact) = self.contacts.get_mut(&owner) else {
            return false;
        };
        if contact.acted || contact.overlay.is_some() || !contact.key.supports_long_press() {
            return false;
        }
        debug!(
            key = contact.key.key.0,
            held_ms = now.saturating_duration_since(contact.start_time).as_millis() as u64,
            "long press"
        );
        contact.overlay = Some(Overlay::new(
            contact.key.long_press_choices.clone(),
            contact.position.x,
        ));
        let key = contact.key.key;
        self.timers.cancel_kind_owned_by(TimerKind::Repeat, owner);
        self.dispatcher.key_feedback(KeyFeedback::LongPressed(key));
        true
    }

    fn set_mode(&mut self, mode: GestureMode, owner: Option<ContactId>) {
        self.mode_owner = owner;
        if self.mode == mode {
            return;
        }
        debug!(from = ?self.mode, to = ?mode, "gesture mode change");
        if self.mode == GestureMode::Typing {
            if let Some(contact) = owner.and_then(|id| self.contacts.get(&id)) {
                if mode == GestureMode::CursorMoving {
                    self.dispatcher
                        .key_feedback(KeyFeedback::Released(contact.key.key));
                }
            }
        }
        self.mode = mode;
        self.dispatcher.mode_changed(mode);
    }

    fn began(&mut self, event: ContactEvent) {
        let Some(hit) = event.key else {
            trace!(id = event.id, "begin without a key");
            return;
        };
        if self.contacts.contains_key(&event.id) {
            debug!(id = event.id, "duplicate begin ignored");
            return;
        }
        if !self.enabled || hit.action == KeyAction::None {
            return;
        }
        if self.mode != GestureMode::Typing {
            trace!(id = event.id, mode = ?self.mode, "contact ignored outside typing");
            return;
        }

        if self.config.device_idiom == DeviceIdiom::Phone {
            self.commit_others(event.id, event.timestamp, true);
        }
        // Single key at a time: any outstanding timer belongs to an older key.
        self.timers.cancel_all();

        let id = event.id;
        let now = event.timestamp;
        let mut contact = Contact::new(event.position, now, hit, event.force);
        // A double tap on shift must not have another key in between.
        if !contact.key.action.is_shift() {
            self.last_shift_tap = None;
        }
        self.dispatcher
            .key_feedback(KeyFeedback::Pressed(contact.key.key));

        match contact.key.action.clone() {
            KeyAction::Backspace => {
                self.suppress_others(id);
                self.contacts.insert(id, contact);
                self.queue.push_back(id);
                self.set_mode(GestureMode::Backspacing, Some(id));
                self.timers.schedule(
                    TimerKind::Repeat,
                    id,
                    now + self.config.key_repeat_initial_delay(),
                    Some(self.config.key_repeat_interval()),
                );
                return;
            }
            KeyAction::NextKeyboard => {
                contact.acted = true;
                self.contacts.insert(id, contact);
                self.queue.push_back(id);
                self.set_mode(GestureMode::NextKeyboardHandoff, Some(id));
                self.dispatcher.dispatch(KeyboardAction::NextKeyboard);
                return;
            }
            KeyAction::KeyboardType(kind) => {
                contact.acted = true;
                self.dispatcher.dispatch(KeyboardAction::KeyboardType(kind));
            }
            KeyAction::Shift(_) => {
                let window = self.config.double_tap_window();
                let is_double_tap = self
                    .last_shift_tap
                    .is_some_and(|last| now.saturating_duration_since(last) <= window);
                if is_double_tap {
                    contact.acted = true;
                    self.last_shift_tap = None;
                    self.dispatcher.dispatch(KeyboardAction::CapsLock);
                } else {
                    contact.holding_modifier = true;
                    self.last_shift_tap = Some(now);
                    self.dispatcher.dispatch(KeyboardAction::ShiftDown);
                }
            }
            KeyAction::Character(_) | KeyAction::Space | KeyAction::NewLine => {
                if contact.key.supports_long_press() {
                    self.timers.schedule(
                        TimerKind::LongPress,
                        id,
                        now + self.config.long_press_delay(),
                        None,
                    );
                }
            }
            KeyAction::None => {}
        }

        self.contacts.insert(id, contact);
        self.queue.push_back(id);
    }

    fn moved(&mut self, event: ContactEvent) {
        let id = event.id;
        let Some(contact) = self.contacts.get_mut(&id) else {
            trace!(id, "move for unknown contact");
            return;
        };
        contact.position = event.position;
        if event.force.is_some() {
            contact.force = event.force;
        }
        let is_owner = self.mode_owner == Some(id);

        match self.mode {
            GestureMode::Backspacing if is_owner => {
                let dx = event.position.x - contact.start.x;
                if dx < -self.config.swipe_delete_threshold && !contact.acted {
                    contact.acted = true;
                    self.timers.cancel_kind_owned_by(TimerKind::Repeat, id);
                    debug!(id, "swipe to delete word");
                    self.dispatcher.dispatch(KeyboardAction::DeleteWordSwipe);
                }
            }
            GestureMode::CursorMoving if is_owner => {
                let step = self.config.effective_cursor_step();
                let dx = event.position.x - contact.anchor.x;
                let steps = (dx.abs() / step).floor() as u32;
                if steps == 0 {
                    return;
                }
                let action = if dx < 0.0 {
                    KeyboardAction::MoveCursorBackward
                } else {
                    KeyboardAction::MoveCursorForward
                };
                contact.anchor.x += dx.signum() * steps as f32 * step;
                for _ in 0..steps {
                    self.dispatcher.dispatch(action.clone());
                }
            }
            GestureMode::Typing => self.moved_typing(event),
            _ => {}
        }
    }

    fn moved_typing(&mut self, event: ContactEvent) {
        let id = event.id;
        let Some(contact) = self.contacts.get_mut(&id) else {
            return;
        };

        if let Some(overlay) = contact.overlay.as_mut() {
            overlay.select_at(event.position.x, self.config.overlay_step);
            return;
        }

        if contact.start.distance_to(event.position) > self.config.long_press_cancel_distance {
            self.timers.cancel_kind_owned_by(TimerKind::LongPress, id);
        }

        if !contact.holding_modifier {
            let dx = (event.position.x - contact.start.x).abs();
            if dx >= self.config.cursor_move_threshold {
                let force_swipe = dx > self.config.force_swipe_min_distance
                    && contact
                        .force
                        .is_some_and(|f| f.is_strong(self.config.strong_press_ratio));
                let starts_cursor = match contact.initial_action {
                    KeyAction::Space => true,
                    KeyAction::Character(_) => force_swipe,
                    _ => false,
                };
                if starts_cursor {
                    contact.anchor = event.position;
                    contact.acted = true;
                    self.commit_others(id, event.timestamp, false);
                    self.timers.cancel_all();
                    self.set_mode(GestureMode::CursorMoving, Some(id));
                    return;
                }
            }
        }

        let Some(hit) = event.key else {
            return;
        };
        if hit.key == contact.key.key {
            return;
        }
        // Re-target: the finger slid onto another key before release.
        let old = contact.key.key;
        let supports_long_press = hit.supports_long_press();
        contact.key = hit;
        let new = contact.key.key;
        trace!(id, from = old.0, to = new.0, "contact re-targeted");
        self.timers.cancel_owned_by(id);
        if supports_long_press {
            self.timers.schedule(
                TimerKind::LongPress,
                id,
                event.timestamp + self.config.long_press_delay(),
                None,
            );
        }
        self.dispatcher.key_feedback(KeyFeedback::Released(old));
        self.dispatcher.key_feedback(KeyFeedback::Pressed(new));
    }

    fn ended(&mut self, event: ContactEvent, cancelled: bool) {
        let id = event.id;
        let Some(contact) = self.contacts.get_mut(&id) else {
            trace!(id, cancelled, "end for unknown contact");
            return;
        };
        // Timers go first so nothing fires on behalf of a finished contact.
        self.timers.cancel_owned_by(id);
        contact.position = event.position;
        if let Some(hit) = event.key {
            if contact.overlay.is_none() && self.mode == GestureMode::Typing {
                contact.key = hit;
            }
        }

        if !cancelled
            && self.mode == GestureMode::Typing
            && self.config.device_idiom == DeviceIdiom::Pad
        {
            let older: Vec<ContactId> = self
                .queue
                .iter()
                .copied()
                .take_while(|other| *other != id)
                .filter(|other| {
                    self.contacts
                        .get(other)
                        .is_some_and(|c| !c.holding_modifier)
                })
                .collect();
            for other in older {
                self.finish(other, event.timestamp, false);
            }
        }

        self.finish(id, event.timestamp, cancelled);
    }

    /// Commit every active contact except `except`, oldest first.
    fn commit_others(&mut self, except: ContactId, now: Instant, keep_modifiers: bool) {
        let others: Vec<ContactId> = self
            .queue
            .iter()
            .copied()
            .filter(|id| *id != except)
            .filter(|id| {
                !keep_modifiers
                    || self
                        .contacts
                        .get(id)
                        .is_some_and(|c| !c.holding_modifier)
            })
            .collect();
        for id in others {
            self.finish(id, now, false);
        }
    }

    /// Remove a contact and emit whatever its release resolves to.
    fn finish(&mut self, id: ContactId, now: Instant, cancelled: bool) {
        let Some(contact) = self.contacts.remove(&id) else {
            return;
        };
        self.queue.retain(|other| *other != id);
        self.timers.cancel_owned_by(id);
        let is_owner = self.mode_owner == Some(id);
        let released_on_mode_entry = is_owner && self.mode == GestureMode::CursorMoving;
        trace!(
            id,
            cancelled,
            held_ms = now.saturating_duration_since(contact.start_time).as_millis() as u64,
            "contact finished"
        );

        match self.mode {
            GestureMode::Backspacing if is_owner => {
                if !cancelled && !contact.acted && !contact.repeated {
                    self.dispatcher.dispatch(KeyboardAction::Backspace);
                }
                self.set_mode(GestureMode::Typing, None);
            }
            GestureMode::CursorMoving if is_owner => {
                self.dispatcher.dispatch(KeyboardAction::MoveCursorEnded);
                self.set_mode(GestureMode::Typing, None);
            }
            GestureMode::NextKeyboardHandoff if is_owner => {
                self.set_mode(GestureMode::Typing, None);
            }
            GestureMode::Typing if !cancelled => self.resolve_tap(&contact),
            _ => {
                // Suppressed or cancelled: only make sure shift is not left down.
                if contact.holding_modifier {
                    self.dispatcher.dispatch(KeyboardAction::ShiftUp);
                }
            }
        }

        if !released_on_mode_entry {
            self.dispatcher
                .key_feedback(KeyFeedback::Released(contact.key.key));
        }
    }

    fn resolve_tap(&mut self, contact: &Contact) {
        if let Some(overlay) = &contact.overlay {
            if let Some(choice) = overlay.selected_choice() {
                self.dispatcher
                    .dispatch(KeyboardAction::Character(choice.to_string()));
                self.mark_shift_used();
            }
            return;
        }

        if let KeyAction::Shift(_) = contact.key.action {
            if contact.holding_modifier {
                let action = if !contact.typed_while_held
                    && contact.initial_action == KeyAction::Shift(ShiftState::Lowercased)
                {
                    KeyboardAction::ShiftRelax
                } else {
                    KeyboardAction::ShiftUp
                };
                self.dispatcher.dispatch(action);
            }
            return;
        }

        if contact.acted {
            return;
        }
        let Some(action) = KeyboardAction::from_tap(&contact.key.action) else {
            return;
        };
        let is_character = contact.key.action.is_character();
        self.dispatcher.dispatch(action);
        if is_character {
            self.mark_shift_used();
            // Dragged from shift onto a character: drop back to lowercase.
            if contact.initial_action.is_shift() {
                self.dispatcher.dispatch(KeyboardAction::ShiftUp);
            }
        }
    }

    /// Other contacts stay tracked but will not produce a tap.
    fn suppress_others(&mut self, except: ContactId) {
        for (id, contact) in self.contacts.iter_mut() {
            if *id != except && !contact.holding_modifier {
                contact.acted = true;
                contact.overlay = None;
            }
        }
    }

    fn mark_shift_used(&mut self) {
        for contact in self.contacts.values_mut() {
            if contact.holding_modifier {
                contact.typed_while_held = true;
            }
        }
    }
}
