//! Virtual time, timers and collaborator notifications for the editor core.
//!
//! The core is single-threaded and event driven. Its only suspension points
//! are timers, and those are modelled here as plain values polled with an
//! explicit `now` so tests can advance time deterministically:
//! * `Debouncer` collapses a burst of triggers into one firing `delay` after
//!   the last trigger; every trigger restarts it and it can be cancelled.
//! * `OneShotTimers` holds fire-and-forget deadlines that cannot be
//!   cancelled once armed; each one expires exactly on schedule.
//!
//! Runtime drivers (the CLI session) map wall-clock instants onto `Tick` and
//! sleep until `next_deadline` of whatever they own.

use std::fmt;
use std::time::Duration;
use tracing::trace;

/// A point on the editor's clock, measured from session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(Duration);

impl Tick {
    pub const ZERO: Tick = Tick(Duration::ZERO);

    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub fn from_duration(d: Duration) -> Self {
        Self(d)
    }

    pub fn as_duration(self) -> Duration {
        self.0
    }

    pub fn as_millis(self) -> u128 {
        self.0.as_millis()
    }

    pub fn after(self, delay: Duration) -> Self {
        Self(self.0.saturating_add(delay))
    }

    /// Time from `self` until `later` (zero if `later` is not later).
    pub fn until(self, later: Tick) -> Duration {
        later.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0.as_millis())
    }
}

/// Cancellable, restartable debounce timer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    name: &'static str,
    delay: Duration,
    deadline: Option<Tick>,
}

impl Debouncer {
    pub fn new(name: &'static str, delay: Duration) -> Self {
        Self {
            name,
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the timer so it fires `delay` after `now`.
    pub fn trigger(&mut self, now: Tick) {
        let restarted = self.deadline.is_some();
        self.deadline = Some(now.after(self.delay));
        trace!(target: "events.timer", timer = self.name, restarted, now = %now, "debounce_armed");
    }

    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            trace!(target: "events.timer", timer = self.name, "debounce_cancelled");
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Tick> {
        self.deadline
    }

    /// Returns true exactly once when the deadline has passed; the timer is
    /// then idle until the next trigger.
    pub fn poll(&mut self, now: Tick) -> bool {
        match self.deadline {
            Some(d) if d <= now => {
                self.deadline = None;
                trace!(target: "events.timer", timer = self.name, now = %now, "debounce_fired");
                true
            }
            _ => false,
        }
    }
}

/// Fire-and-forget one-shot deadlines. Arming never replaces an earlier
/// deadline and nothing can cancel one.
#[derive(Debug, Clone, Default)]
pub struct OneShotTimers {
    deadlines: Vec<Tick>,
}

impl OneShotTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, now: Tick, delay: Duration) {
        self.deadlines.push(now.after(delay));
        self.deadlines.sort_unstable();
    }

    /// Remove expired deadlines and return how many fired.
    pub fn poll(&mut self, now: Tick) -> usize {
        let fired = self.deadlines.partition_point(|d| *d <= now);
        self.deadlines.drain(..fired);
        fired
    }

    pub fn next_deadline(&self) -> Option<Tick> {
        self.deadlines.first().copied()
    }

    pub fn armed(&self) -> usize {
        self.deadlines.len()
    }
}

/// Earliest of several optional deadlines.
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Tick>>) -> Option<Tick> {
    deadlines.into_iter().flatten().min()
}

/// Payload handed to `on_update` subscribers (analyzers, persistence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePayload {
    pub markup: String,
    pub text: String,
}

/// Collaborator hooks invoked by the editor model. Both default to no-ops so
/// subscribers implement only what they consume. Hooks must not block.
pub trait EditorObserver {
    fn on_update(&self, _payload: &UpdatePayload) {}
    fn on_save(&self, _markup: &str) {}
}

/// Default no-op observer.
pub struct NoopObserver;

impl EditorObserver for NoopObserver {}
