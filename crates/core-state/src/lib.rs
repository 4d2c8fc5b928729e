//! Per-document edit state: the snapshot-based undo/redo history.
//!
//! One `HistoryManager` is constructed alongside each document tree; nothing
//! here is global, so several open documents never share history.
//!
//! Snapshot policy:
//! * Every raw content change calls `record_edit`, which (re)starts a debounce
//!   timer. Bursts of edits inside the window collapse into one snapshot of the
//!   full markup taken when the timer fires.
//! * Recording truncates any redo branch before appending.
//! * History is bounded; on overflow the oldest snapshot is evicted and the
//!   cursor shifts down with it.
//! * Restoring a snapshot enters `Applying`. The content-changed event the
//!   restore itself produces is swallowed by `record_edit` so undo/redo never
//!   record their own effect.

pub mod history;

pub use history::{
    DEFAULT_CAPACITY, DEFAULT_DEBOUNCE, HistoryManager, HistoryState, RecordOutcome, Snapshot,
};
