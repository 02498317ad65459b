//! Logical timers for key repeat and long-press.
//!
//! Timers never own a thread or an OS handle. Each scheduled timer carries a
//! generation number; a firing is honoured only while its handle still matches
//! the one registered in its slot, so a stale firing (cancelled, or replaced by
//! a timer for another key) is a no-op.

use super::contact::ContactId;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Repeat,
    LongPress,
}

/// Identity of one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    pub kind: TimerKind,
    generation: u64,
}

#[derive(Debug, Clone)]
struct ScheduledTimer {
    handle: TimerHandle,
    owner: ContactId,
    deadline: Instant,
    period: Option<Duration>,
    ticks: u32,
}

/// One slot per timer kind: at most one repeat and one long-press timer exist at a time.
#[derive(Debug, Default)]
pub(crate) struct TimerSlots {
    next_generation: u64,
    repeat: Option<ScheduledTimer>,
    long_press: Option<ScheduledTimer>,
}

impl TimerSlots {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: TimerKind) -> &Option<ScheduledTimer> {
        match kind {
            TimerKind::Repeat => &self.repeat,
            TimerKind::LongPress => &self.long_press,
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<ScheduledTimer> {
        match kind {
            TimerKind::Repeat => &mut self.repeat,
            TimerKind::LongPress => &mut self.long_press,
        }
    }

    /// Schedule a timer, replacing whatever occupied the slot.
    pub(crate) fn schedule(
        &mut self,
        kind: TimerKind,
        owner: ContactId,
        deadline: Instant,
        period: Option<Duration>,
    ) -> TimerHandle {
        self.next_generation += 1;
        let handle = TimerHandle {
            kind,
            generation: self.next_generation,
        };
        *self.slot_mut(kind) = Some(ScheduledTimer {
            handle,
            owner,
            deadline,
            period: period.map(|p| p.max(Duration::from_millis(1))),
            ticks: 0,
        });
        handle
    }

    pub(crate) fn cancel_kind_owned_by(&mut self, kind: TimerKind, owner: ContactId) {
        let slot = self.slot_mut(kind);
        if slot.as_ref().is_some_and(|t| t.owner == owner) {
            *slot = None;
        }
    }

    pub(crate) fn cancel_owned_by(&mut self, owner: ContactId) {
        self.cancel_kind_owned_by(TimerKind::Repeat, owner);
        self.cancel_kind_owned_by(TimerKind::LongPress, owner);
    }

    pub(crate) fn cancel_all(&mut self) {
        self.repeat = None;
        self.long_press = None;
    }

    pub(crate) fn is_current(&self, handle: TimerHandle) -> bool {
        self.slot(handle.kind)
            .as_ref()
            .is_some_and(|t| t.handle == handle)
    }

    pub(crate) fn current(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.slot(kind).as_ref().map(|t| t.handle)
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        [&self.repeat, &self.long_press]
            .into_iter()
            .flatten()
            .map(|t| t.deadline)
            .min()
    }

    /// Earliest timer due at or before `now`.
    pub(crate) fn next_due(&self, now: Instant) -> Option<TimerHandle> {
        [&self.repeat, &self.long_press]
            .into_iter()
            .flatten()
            .filter(|t| t.deadline <= now)
            .min_by_key(|t| t.deadline)
            .map(|t| t.handle)
    }

    /// Consume one firing of `handle`. Returns the owner and the 1-based tick count.
    ///
    /// Periodic timers move their deadline forward by one period; one-shot timers
    /// are removed.
    pub(crate) fn advance(&mut self, handle: TimerHandle) -> Option<(ContactId, u32)> {
        let slot = self.slot_mut(handle.kind);
        let timer = slot.as_mut().filter(|t| t.handle == handle)?;
        timer.ticks += 1;
        let fired = (timer.owner, timer.ticks);
        let period = timer.period;
        match period {
            Some(period) => timer.deadline += period,
            None => *slot = None,
        }
        Some(fired)
    }
}
