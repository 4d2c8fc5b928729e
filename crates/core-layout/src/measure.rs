//! Layout capability consumed by pagination and page sync.
//!
//! Real geometry belongs to whatever renders the document. The core only
//! asks three questions through `Measurer`, all in client coordinates (the
//! same space as a DOM `getBoundingClientRect`):
//! * where is the scroll container and how far is it scrolled
//! * where is a top-level block
//! * where is the caret inside a text segment
//!
//! `None` from `viewport` means the surface has not been laid out yet.
//!
//! `StackedMeasurer` is a deterministic stand-in that stacks top-level
//! nodes vertically using a fixed character grid. The CLI and the tests
//! drive pagination through it.

use core_doc::{Document, NodeId, NodeKind};
use std::collections::HashMap;
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// Scroll container geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Top edge of the container in client coordinates.
    pub container_top: f32,
    pub scroll_top: f32,
    pub client_height: f32,
    /// Total content height.
    pub scroll_height: f32,
}

impl Viewport {
    /// Convert a client-space y coordinate into content space.
    pub fn to_content(&self, client_y: f32) -> f32 {
        client_y - self.container_top + self.scroll_top
    }
}

pub trait Measurer {
    fn viewport(&self) -> Option<Viewport>;
    fn block_rect(&self, node: NodeId) -> Option<Rect>;
    /// Client-space top of a collapsed caret at `local` bytes into `segment`.
    fn caret_top(&self, segment: NodeId, local: usize) -> Option<f32>;
}

/// A surface that has not rendered yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrendered;

impl Measurer for Unrendered {
    fn viewport(&self) -> Option<Viewport> {
        None
    }

    fn block_rect(&self, _node: NodeId) -> Option<Rect> {
        None
    }

    fn caret_top(&self, _segment: NodeId, _local: usize) -> Option<f32> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackedMetrics {
    pub chars_per_line: usize,
    pub line_height: f32,
    /// Vertical space between top-level boxes.
    pub block_gap: f32,
}

impl Default for StackedMetrics {
    fn default() -> Self {
        Self {
            chars_per_line: 80,
            line_height: 24.0,
            block_gap: 16.0,
        }
    }
}

/// Where a text segment starts inside its box.
#[derive(Debug, Clone)]
struct CaretAnchor {
    text: String,
    box_top: f32,
    /// Visual line on which the segment's logical line starts.
    line: usize,
    /// Graphemes already on that logical line before the segment.
    col: usize,
}

/// Fixed-grid estimator: every grapheme takes one cell, lines wrap at
/// `chars_per_line`, line breaks and nested blocks start a new line.
#[derive(Debug, Clone)]
pub struct StackedMeasurer {
    metrics: StackedMetrics,
    container_top: f32,
    client_height: f32,
    scroll_top: f32,
    content_height: f32,
    rects: HashMap<NodeId, Rect>,
    anchors: HashMap<NodeId, CaretAnchor>,
    generation: Option<u64>,
}

impl StackedMeasurer {
    pub fn new(metrics: StackedMetrics, client_height: f32) -> Self {
        Self {
            metrics: StackedMetrics {
                chars_per_line: metrics.chars_per_line.max(1),
                ..metrics
            },
            container_top: 0.0,
            client_height: client_height.max(0.0),
            scroll_top: 0.0,
            content_height: 0.0,
            rects: HashMap::new(),
            anchors: HashMap::new(),
            generation: None,
        }
    }

    /// Offset the container from the client origin (toolbars above it).
    pub fn with_container_top(mut self, top: f32) -> Self {
        self.container_top = top;
        self
    }

    pub fn metrics(&self) -> StackedMetrics {
        self.metrics
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    /// Scroll, clamped to the scrollable range. Returns the applied offset.
    pub fn set_scroll_top(&mut self, y: f32) -> f32 {
        let max = (self.content_height - self.client_height).max(0.0);
        self.scroll_top = if y.is_finite() { y.clamp(0.0, max) } else { 0.0 };
        self.scroll_top
    }

    pub fn set_client_height(&mut self, height: f32) {
        self.client_height = height.max(0.0);
        let current = self.scroll_top;
        self.set_scroll_top(current);
    }

    /// True when the last layout pass saw the document as it is now.
    pub fn is_laid_out_for(&self, doc: &Document) -> bool {
        self.generation == Some(doc.generation())
    }

    /// Lay the document out from scratch.
    pub fn layout(&mut self, doc: &Document) {
        self.rects.clear();
        self.anchors.clear();
        let mut y = 0.0f32;
        let mut boxes = 0usize;
        let mut run: Option<Flow> = None;
        for child in doc.children(doc.root()) {
            if let NodeKind::Element { .. } = doc.kind(*child) {
                if let Some(flow) = run.take() {
                    y = self.close_box(flow, &mut boxes);
                }
                let mut flow = Flow::new(y);
                self.flow_children(doc, *child, &mut flow);
                let height = flow.height(&self.metrics);
                self.rects.insert(*child, Rect::new(y, height));
                y = self.close_box(flow, &mut boxes);
            } else {
                let flow = run.get_or_insert_with(|| Flow::new(y));
                self.flow_node(doc, *child, flow);
            }
        }
        if let Some(flow) = run.take() {
            y = self.close_box(flow, &mut boxes);
        }
        self.content_height = if boxes > 0 {
            (y - self.metrics.block_gap).max(0.0)
        } else {
            0.0
        };
        self.generation = Some(doc.generation());
        let current = self.scroll_top;
        self.set_scroll_top(current);
        trace!(
            target: "layout.pages",
            boxes,
            content_height = self.content_height,
            "stacked_layout"
        );
    }

    fn close_box(&self, flow: Flow, boxes: &mut usize) -> f32 {
        *boxes += 1;
        flow.top + flow.height(&self.metrics) + self.metrics.block_gap
    }

    fn flow_children(&mut self, doc: &Document, id: NodeId, flow: &mut Flow) {
        for child in doc.children(id) {
            self.flow_node(doc, *child, flow);
        }
    }

    fn flow_node(&mut self, doc: &Document, id: NodeId, flow: &mut Flow) {
        let cpl = self.metrics.chars_per_line;
        match doc.kind(id) {
            NodeKind::Text(text) => {
                self.anchors.insert(
                    id,
                    CaretAnchor {
                        text: text.clone(),
                        box_top: flow.top,
                        line: flow.line,
                        col: flow.col,
                    },
                );
                flow.col += text.graphemes(true).count();
            }
            NodeKind::LineBreak => flow.break_line(cpl),
            NodeKind::Element { .. } => {
                let block = doc.is_block(id);
                if block && flow.col > 0 {
                    flow.break_line(cpl);
                }
                self.flow_children(doc, id, flow);
                if block && flow.col > 0 {
                    flow.break_line(cpl);
                }
            }
        }
    }

    fn to_client(&self, content_y: f32) -> f32 {
        content_y + self.container_top - self.scroll_top
    }
}

#[derive(Debug, Clone, Copy)]
struct Flow {
    top: f32,
    line: usize,
    col: usize,
}

impl Flow {
    fn new(top: f32) -> Self {
        Self {
            top,
            line: 0,
            col: 0,
        }
    }

    fn break_line(&mut self, cpl: usize) {
        self.line += self.col.div_ceil(cpl).max(1);
        self.col = 0;
    }

    fn height(&self, metrics: &StackedMetrics) -> f32 {
        let lines = self.line + self.col.div_ceil(metrics.chars_per_line);
        lines as f32 * metrics.line_height
    }
}

impl Measurer for StackedMeasurer {
    fn viewport(&self) -> Option<Viewport> {
        self.generation?;
        Some(Viewport {
            container_top: self.container_top,
            scroll_top: self.scroll_top,
            client_height: self.client_height,
            scroll_height: self.content_height,
        })
    }

    fn block_rect(&self, node: NodeId) -> Option<Rect> {
        let r = self.rects.get(&node)?;
        Some(Rect::new(self.to_client(r.top), r.height))
    }

    fn caret_top(&self, segment: NodeId, local: usize) -> Option<f32> {
        let anchor = self.anchors.get(&segment)?;
        let prefix = anchor.text.get(..local)?;
        let col = anchor.col + prefix.graphemes(true).count();
        let line = anchor.line + col / self.metrics.chars_per_line;
        Some(self.to_client(
            anchor.box_top + line as f32 * self.metrics.line_height,
        ))
    }
}
