use core_events::{Debouncer, Tick};
use std::time::Duration;
use tracing::{debug, trace};

/// Maximum number of snapshots retained by default.
pub const DEFAULT_CAPACITY: usize = 50;
/// Default quiet period before a burst of edits is snapshotted.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Full serialized markup of the document at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    markup: String,
}

impl Snapshot {
    pub fn markup(&self) -> &str {
        &self.markup
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Idle,
    /// Debounce timer running; a snapshot will be taken when it fires.
    PendingSnapshot,
    /// A restored snapshot is being applied; the next content change is ours.
    Applying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The change came from applying a snapshot and was not recorded.
    Suppressed,
    /// The debounce timer was (re)started.
    Scheduled,
}

#[derive(Debug)]
pub struct HistoryManager {
    snapshots: Vec<Snapshot>,
    /// Position of the snapshot matching the current document; `None` only
    /// while the history is empty.
    index: Option<usize>,
    capacity: usize,
    timer: Debouncer,
    applying: bool,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_DEBOUNCE)
    }
}

impl HistoryManager {
    pub fn new(capacity: usize, debounce: Duration) -> Self {
        Self {
            snapshots: Vec::new(),
            index: None,
            capacity: capacity.max(1),
            timer: Debouncer::new("history", debounce),
            applying: false,
        }
    }

    /// Reset history to a single snapshot of freshly loaded content.
    pub fn seed(&mut self, markup: impl Into<String>) {
        self.snapshots.clear();
        self.snapshots.push(Snapshot {
            markup: markup.into(),
        });
        self.index = Some(0);
        self.timer.cancel();
        self.applying = false;
        trace!(target: "state.history", "history_seeded");
    }

    pub fn state(&self) -> HistoryState {
        if self.applying {
            HistoryState::Applying
        } else if self.timer.is_pending() {
            HistoryState::PendingSnapshot
        } else {
            HistoryState::Idle
        }
    }

    /// Called on every raw content-changed event.
    pub fn record_edit(&mut self, now: Tick) -> RecordOutcome {
        if self.applying {
            self.applying = false;
            trace!(target: "state.history", "record_suppressed_while_applying");
            return RecordOutcome::Suppressed;
        }
        self.timer.trigger(now);
        RecordOutcome::Scheduled
    }

    /// Fire the debounce timer if due, snapshotting the markup produced by
    /// `markup`. Returns true when a snapshot was appended.
    pub fn poll(&mut self, now: Tick, markup: impl FnOnce() -> String) -> bool {
        if self.timer.poll(now) {
            self.commit(markup());
            true
        } else {
            false
        }
    }

    /// Take a pending snapshot immediately (e.g. before undo, on save).
    pub fn flush_pending(&mut self, markup: impl FnOnce() -> String) -> bool {
        if !self.timer.is_pending() {
            return false;
        }
        self.timer.cancel();
        self.commit(markup());
        true
    }

    pub fn next_deadline(&self) -> Option<Tick> {
        self.timer.deadline()
    }

    /// Append a snapshot: drop the redo branch, push, evict on overflow.
    pub fn commit(&mut self, markup: String) {
        let keep = self.index.map_or(0, |i| i + 1);
        let discarded = self.snapshots.len().saturating_sub(keep);
        self.snapshots.truncate(keep);
        self.snapshots.push(Snapshot { markup });
        let mut index = self.snapshots.len() - 1;
        if self.snapshots.len() > self.capacity {
            self.snapshots.remove(0);
            index -= 1;
            trace!(target: "state.history", capacity = self.capacity, "history_trimmed");
        }
        self.index = Some(index);
        debug!(
            target: "state.history",
            len = self.snapshots.len(),
            index,
            redo_discarded = discarded,
            "snapshot_committed"
        );
    }

    /// Step back one snapshot. Enters `Applying`; the caller overwrites the
    /// tree with the returned markup.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        let i = self.index.filter(|i| *i > 0)?;
        self.index = Some(i - 1);
        self.begin_apply();
        trace!(target: "state.history", index = i - 1, len = self.snapshots.len(), "undo");
        self.snapshots.get(i - 1)
    }

    /// Step forward one snapshot. Enters `Applying` like `undo`.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        let i = self.index.filter(|i| i + 1 < self.snapshots.len())?;
        self.index = Some(i + 1);
        self.begin_apply();
        trace!(target: "state.history", index = i + 1, len = self.snapshots.len(), "redo");
        self.snapshots.get(i + 1)
    }

    fn begin_apply(&mut self) {
        // A pending timer would otherwise snapshot the restored state and
        // drop the redo branch.
        self.timer.cancel();
        self.applying = true;
    }

    pub fn can_undo(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.index.is_some_and(|i| i + 1 < self.snapshots.len())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.index.and_then(|i| self.snapshots.get(i))
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }
}
