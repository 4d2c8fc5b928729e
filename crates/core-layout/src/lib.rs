//! Pagination and page synchronisation over host-measured layout.
//!
//! * `measure`: the `Measurer` capability plus a fixed-grid estimator.
//! * `pages`: page count, page ranges and per-page previews.
//! * `sync`: the active page, driven by caret movement, scrolling and
//!   programmatic jumps.

pub mod measure;
pub mod pages;
pub mod sync;

pub use measure::{Measurer, Rect, StackedMeasurer, StackedMetrics, Unrendered, Viewport};
pub use pages::{
    DEFAULT_PAGE_HEIGHT, DEFAULT_PREVIEW_WORDS, MAX_PAGES, MIN_PAGE_HEIGHT, Page, Paginator, RefreshOutcome, page_count_for,
    page_for_offset, preview_text,
};
pub use sync::{DEFAULT_JUMP_LOCK, PageTracker};
