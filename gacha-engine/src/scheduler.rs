//! Fixed-delay timers tied to session identity.
//!
//! The session hands out [`TimerTicket`]s stamped with its current
//! generation; a ticket that comes back after the generation moved on is
//! ignored, so a torn-down session can never be mutated by a late timer.
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a timer completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// PRELOAD warm-up has elapsed; hand control to SHOW.
    PreloadWarmup,
    /// The reward popup has been visible long enough.
    RewardPopup,
}

/// Opaque handle delivered back to the session when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerTicket {
    generation: u64,
    kind: TimerKind,
}

impl TimerTicket {
    #[must_use]
    pub(crate) const fn new(generation: u64, kind: TimerKind) -> Self {
        Self { generation, kind }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn kind(&self) -> TimerKind {
        self.kind
    }
}

/// Host capability for one-shot delayed callbacks.
///
/// Implementations must eventually hand each ticket back to
/// [`GachaSession::on_timer`](crate::GachaSession::on_timer) after `delay`.
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration, ticket: TimerTicket);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTimer {
    deadline: Duration,
    seq: u64,
    ticket: TimerTicket,
}

/// Deterministic scheduler driven by an explicit virtual clock.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    now: Duration,
    next_seq: u64,
    pending: Vec<PendingTimer>,
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest pending deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.iter().map(|timer| timer.deadline).min()
    }

    /// Move the clock forward and return every ticket now due, earliest first.
    /// Timers with equal deadlines fire in scheduling order.
    pub fn advance_by(&mut self, elapsed: Duration) -> Vec<TimerTicket> {
        self.now += elapsed;
        let now = self.now;
        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|timer| timer.deadline <= now);
        self.pending = pending;
        due.sort_by_key(|timer| (timer.deadline, timer.seq));
        due.into_iter().map(|timer| timer.ticket).collect()
    }

    /// Drop every pending timer without firing it.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&mut self, delay: Duration, ticket: TimerTicket) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(PendingTimer {
            deadline: self.now + delay,
            seq,
            ticket,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_only_once_due() {
        let mut queue = TimerQueue::new();
        queue.schedule(
            Duration::from_millis(2_000),
            TimerTicket::new(1, TimerKind::PreloadWarmup),
        );
        assert_eq!(queue.next_deadline(), Some(Duration::from_millis(2_000)));
        assert!(queue.advance_by(Duration::from_millis(1_999)).is_empty());
        let due = queue.advance_by(Duration::from_millis(1));
        assert_eq!(due, vec![TimerTicket::new(1, TimerKind::PreloadWarmup)]);
        assert!(queue.is_empty());
        assert_eq!(queue.now(), Duration::from_millis(2_000));
    }

    #[test]
    fn due_timers_come_back_in_deadline_then_schedule_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(
            Duration::from_millis(30),
            TimerTicket::new(2, TimerKind::RewardPopup),
        );
        queue.schedule(
            Duration::from_millis(10),
            TimerTicket::new(1, TimerKind::PreloadWarmup),
        );
        queue.schedule(
            Duration::from_millis(30),
            TimerTicket::new(3, TimerKind::RewardPopup),
        );
        let due = queue.advance_by(Duration::from_millis(50));
        let generations: Vec<u64> = due.iter().map(TimerTicket::generation).collect();
        assert_eq!(generations, vec![1, 2, 3]);
    }

    #[test]
    fn clear_drops_pending_timers() {
        let mut queue = TimerQueue::new();
        queue.schedule(
            Duration::from_millis(5),
            TimerTicket::new(1, TimerKind::RewardPopup),
        );
        queue.clear();
        assert!(queue.advance_by(Duration::from_secs(1)).is_empty());
        assert_eq!(queue.len(), 0);
    }
}
