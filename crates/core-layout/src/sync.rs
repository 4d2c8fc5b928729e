//! Active-page tracking for the navigation rail.
//!
//! Two independent signals move the active page: caret movement and
//! scrolling. A programmatic jump holds a short lock so the selection side
//! does not pull the page back while the scroll animation is in flight. The
//! lock is released by fire-and-forget one-shot timers; several jumps in a
//! row arm several timers and the first one to expire releases the lock.

use crate::measure::Measurer;
use crate::pages::Paginator;
use core_doc::{Document, Point};
use core_events::{OneShotTimers, Tick};
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_JUMP_LOCK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct PageTracker {
    active: usize,
    locked: bool,
    lock_delay: Duration,
    timers: OneShotTimers,
}

impl Default for PageTracker {
    fn default() -> Self {
        Self::new(DEFAULT_JUMP_LOCK)
    }
}

impl PageTracker {
    pub fn new(lock_delay: Duration) -> Self {
        Self {
            active: 0,
            locked: false,
            lock_delay,
            timers: OneShotTimers::new(),
        }
    }

    pub fn active_page(&self) -> usize {
        self.active
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn next_deadline(&self) -> Option<Tick> {
        self.timers.next_deadline()
    }

    /// Fire expired lock timers. Returns true when the lock was released.
    pub fn poll(&mut self, now: Tick) -> bool {
        if self.timers.poll(now) > 0 && self.locked {
            self.locked = false;
            trace!(target: "layout.sync", now = %now, "jump_lock_released");
            return true;
        }
        false
    }

    /// Navigate to `page`. Sets the active page, locks selection sync and
    /// returns the content-space scroll target.
    pub fn jump_to_page(&mut self, page: usize, pages: &Paginator, now: Tick) -> f32 {
        let target = page.min(pages.page_count() - 1);
        self.active = target;
        self.locked = true;
        self.timers.arm(now, self.lock_delay);
        debug!(target: "layout.sync", requested = page, page = target, "jump_to_page");
        pages.page_top(target)
    }

    /// Caret moved. `caret` is `None` when the selection is outside the
    /// surface. Returns the new active page when it changed.
    pub fn on_selection_change(
        &mut self,
        caret: Option<Point>,
        doc: &Document,
        measurer: &dyn Measurer,
        pages: &Paginator,
    ) -> Option<usize> {
        if self.locked {
            trace!(target: "layout.sync", "selection_ignored_while_locked");
            return None;
        }
        let caret = caret.filter(|p| doc.is_attached(p.segment))?;
        let viewport = measurer.viewport()?;
        let top = measurer.caret_top(caret.segment, caret.local)?;
        let page = pages.page_at(viewport.to_content(top));
        self.set_active(page, "selection")
    }

    /// Container scrolled to content-space `scroll_top`.
    pub fn on_scroll(&mut self, scroll_top: f32, pages: &Paginator) -> Option<usize> {
        let page = pages.page_at(scroll_top);
        self.set_active(page, "scroll")
    }

    /// Keep the active page inside a page count that may have shrunk.
    pub fn clamp_to(&mut self, page_count: usize) {
        let last = page_count.saturating_sub(1);
        if self.active > last {
            self.active = last;
            trace!(target: "layout.sync", page = last, "active_page_clamped");
        }
    }

    fn set_active(&mut self, page: usize, source: &'static str) -> Option<usize> {
        if page == self.active {
            return None;
        }
        self.active = page;
        trace!(target: "layout.sync", page, source, "active_page_changed");
        Some(page)
    }
}
