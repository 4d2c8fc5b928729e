//! Offset-addressed tree mutations.
//!
//! Every operation takes the `PositionMap` the caller used to compute its
//! offsets and first checks that the map is current. A map from an older
//! generation yields `DocError::StaleMap` and the tree is left untouched.
//!
//! Range deletion follows DOM range semantics: nodes fully inside the range
//! are removed, partially covered ancestors are kept (never merged), and the
//! boundary segments are truncated. Empty text segments are never left behind.

use crate::map::{Point, PositionMap};
use crate::{Attr, DocError, Document, NodeId};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Where new nodes go: a child slot inside `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPoint {
    pub parent: NodeId,
    pub index: usize,
}

impl Document {
    fn ensure_current(&self, map: &PositionMap) -> Result<(), DocError> {
        if map.is_current(self) {
            Ok(())
        } else {
            Err(DocError::StaleMap {
                map: map.generation(),
                doc: self.generation(),
            })
        }
    }

    fn ensure_attached(&self, point: Point) -> Result<(), DocError> {
        if self.is_attached(point.segment) && self.text(point.segment).is_some() {
            Ok(())
        } else {
            Err(DocError::NodeDetached(point.segment))
        }
    }

    /// Delete `[start, end)` and insert one text segment holding
    /// `replacement` at the start point. Returns the new segment (none when
    /// `replacement` is empty).
    pub fn replace_range(
        &mut self,
        map: &PositionMap,
        start: usize,
        end: usize,
        replacement: &str,
    ) -> Result<Option<NodeId>, DocError> {
        self.ensure_current(map)?;
        if start >= end || !on_boundary(map, start) || !on_boundary(map, end) {
            return Err(DocError::InvalidRange { start, end });
        }
        let (a, b) = map
            .resolve_range(start, end)
            .ok_or(DocError::Unaddressable(start))?;
        let inserted = self.replace_resolved(a, b, replacement)?;
        debug!(
            target: "doc.edit",
            start,
            end,
            replacement_len = replacement.len(),
            generation = self.generation(),
            "range_replaced"
        );
        Ok(inserted)
    }

    /// Replace several non-overlapping ranges resolved against one map.
    ///
    /// Ranges are applied highest offset first. Rewriting a later range only
    /// ever truncates segments to a prefix or touches nodes after it, so the
    /// tree coordinates of every earlier range stay valid without rebuilding
    /// the map. Ranges whose bounds are not backed by text are skipped.
    /// Returns the number of ranges replaced.
    pub fn replace_ranges(
        &mut self,
        map: &PositionMap,
        ranges: &[(usize, usize)],
        replacement: &str,
    ) -> Result<usize, DocError> {
        self.ensure_current(map)?;
        let mut sorted = ranges.to_vec();
        sorted.sort_unstable_by(|x, y| y.0.cmp(&x.0));
        for pair in sorted.windows(2) {
            let (later, earlier) = (pair[0], pair[1]);
            if earlier.1 > later.0 {
                return Err(DocError::InvalidRange {
                    start: later.0,
                    end: earlier.1,
                });
            }
        }
        let mut resolved = Vec::with_capacity(sorted.len());
        for (start, end) in &sorted {
            if start >= end || !on_boundary(map, *start) || !on_boundary(map, *end) {
                return Err(DocError::InvalidRange {
                    start: *start,
                    end: *end,
                });
            }
            match map.resolve_range(*start, *end) {
                Some(points) => resolved.push(points),
                None => trace!(target: "doc.edit", start, end, "range_unaddressable_skipped"),
            }
        }
        for (a, b) in &resolved {
            self.replace_resolved(*a, *b, replacement)?;
        }
        debug!(
            target: "doc.edit",
            requested = ranges.len(),
            replaced = resolved.len(),
            generation = self.generation(),
            "ranges_replaced"
        );
        Ok(resolved.len())
    }

    fn replace_resolved(
        &mut self,
        a: Point,
        b: Point,
        replacement: &str,
    ) -> Result<Option<NodeId>, DocError> {
        self.ensure_attached(a)?;
        self.ensure_attached(b)?;
        if a.segment == b.segment {
            self.replace_within_segment(a.segment, a.local, b.local, replacement)
        } else {
            self.replace_across_segments(a, b, replacement)
        }
    }

    /// Delete `[start, end)` without inserting anything.
    pub fn delete_range(
        &mut self,
        map: &PositionMap,
        start: usize,
        end: usize,
    ) -> Result<(), DocError> {
        self.replace_range(map, start, end, "").map(|_| ())
    }

    fn replace_within_segment(
        &mut self,
        seg: NodeId,
        from: usize,
        to: usize,
        replacement: &str,
    ) -> Result<Option<NodeId>, DocError> {
        let text = self.text(seg).unwrap_or_default().to_string();
        let before = &text[..from];
        let after = &text[to..];
        let inserted = if replacement.is_empty() {
            None
        } else {
            let n = self.create_text(replacement);
            self.insert_after(seg, n)?;
            Some(n)
        };
        if !after.is_empty() {
            let tail = self.create_text(after);
            self.insert_after(inserted.unwrap_or(seg), tail)?;
        }
        if before.is_empty() {
            self.detach(seg);
        } else {
            self.set_text(seg, before);
        }
        Ok(inserted)
    }

    fn replace_across_segments(
        &mut self,
        a: Point,
        b: Point,
        replacement: &str,
    ) -> Result<Option<NodeId>, DocError> {
        let order = self.descendants(self.root());
        let ia = order.iter().position(|n| *n == a.segment);
        let ib = order.iter().position(|n| *n == b.segment);
        let (Some(ia), Some(ib)) = (ia, ib) else {
            return Err(DocError::NodeDetached(a.segment));
        };
        if ia >= ib {
            return Err(DocError::NodeDetached(b.segment));
        }
        let keep: HashSet<NodeId> = self.ancestors(b.segment).into_iter().collect();
        let mut removed = 0usize;
        for n in &order[ia + 1..ib] {
            if keep.contains(n) || !self.is_attached(*n) {
                continue;
            }
            self.detach(*n);
            removed += 1;
        }

        let a_text = self.text(a.segment).unwrap_or_default().to_string();
        let b_text = self.text(b.segment).unwrap_or_default().to_string();
        let head = &a_text[..a.local];
        let tail = &b_text[b.local..];

        let inserted = if replacement.is_empty() {
            None
        } else {
            let n = self.create_text(replacement);
            self.insert_after(a.segment, n)?;
            Some(n)
        };
        if head.is_empty() {
            self.detach(a.segment);
        } else {
            self.set_text(a.segment, head);
        }
        if tail.is_empty() {
            self.detach(b.segment);
        } else {
            self.set_text(b.segment, tail);
        }
        trace!(target: "doc.edit", removed, "cross_segment_delete");
        Ok(inserted)
    }

    /// Resolve a caret offset into a child slot, splitting the segment the
    /// caret falls inside. On an empty document the slot is the end of the
    /// last top-level block (or of the root when there is none).
    pub fn split_at(&mut self, map: &PositionMap, at: usize) -> Result<InsertPoint, DocError> {
        self.ensure_current(map)?;
        if !on_boundary(map, at) {
            return Err(DocError::InvalidRange { start: at, end: at });
        }
        if map.entries().is_empty() && at <= map.full_text().len() {
            return Ok(self.fallback_insert_point());
        }
        let point = map.resolve_caret(at).ok_or(DocError::Unaddressable(at))?;
        self.ensure_attached(point)?;
        let seg = point.segment;
        let parent = self.parent(seg).ok_or(DocError::NodeDetached(seg))?;
        let idx = self.child_index(seg).ok_or(DocError::NodeDetached(seg))?;
        let text = self.text(seg).unwrap_or_default().to_string();
        if point.local == 0 {
            return Ok(InsertPoint { parent, index: idx });
        }
        if point.local >= text.len() {
            return Ok(InsertPoint {
                parent,
                index: idx + 1,
            });
        }
        let tail = self.create_text(&text[point.local..]);
        self.set_text(seg, &text[..point.local]);
        self.insert_child(parent, idx + 1, tail);
        Ok(InsertPoint {
            parent,
            index: idx + 1,
        })
    }

    fn fallback_insert_point(&self) -> InsertPoint {
        let root = self.root();
        match self.children(root).last() {
            Some(last) if self.is_block(*last) => InsertPoint {
                parent: *last,
                index: self.children(*last).len(),
            },
            _ => InsertPoint {
                parent: root,
                index: self.children(root).len(),
            },
        }
    }

    /// Insert typed text at a caret offset, extending an existing segment
    /// when the caret sits inside or at the edge of one.
    pub fn insert_text(&mut self, map: &PositionMap, at: usize, text: &str) -> Result<(), DocError> {
        self.ensure_current(map)?;
        if text.is_empty() {
            return Ok(());
        }
        if !on_boundary(map, at) {
            return Err(DocError::InvalidRange { start: at, end: at });
        }
        if let Some(point) = map.resolve_caret(at) {
            self.ensure_attached(point)?;
            if let Some(s) = self.text_mut(point.segment) {
                s.insert_str(point.local, text);
            }
            self.bump();
            return Ok(());
        }
        let slot = self.split_at(map, at)?;
        let t = self.create_text(text);
        self.insert_child(slot.parent, slot.index, t);
        Ok(())
    }

    /// Copy every top-level node of `fragment` into this document at `at`.
    /// Returns the inserted top-level nodes.
    pub fn insert_fragment(
        &mut self,
        map: &PositionMap,
        at: usize,
        fragment: &Document,
    ) -> Result<Vec<NodeId>, DocError> {
        let slot = self.split_at(map, at)?;
        let mut inserted = Vec::new();
        for (i, child) in fragment.children(fragment.root()).iter().enumerate() {
            let copy = self.import_subtree(fragment, *child);
            self.insert_child(slot.parent, slot.index + i, copy);
            inserted.push(copy);
        }
        debug!(target: "doc.edit", at, nodes = inserted.len(), "fragment_inserted");
        Ok(inserted)
    }

    /// Insert an `<img>` carrying a `data:image/...` URI at `at`.
    pub fn insert_image(
        &mut self,
        map: &PositionMap,
        at: usize,
        data_uri: &str,
    ) -> Result<NodeId, DocError> {
        if !data_uri.starts_with("data:image/") {
            return Err(DocError::InvalidImage);
        }
        let slot = self.split_at(map, at)?;
        let img = self.create_element("img", vec![Attr::new("src", data_uri)]);
        self.insert_child(slot.parent, slot.index, img);
        Ok(img)
    }

    /// Wrap the text covered by `[start, end)` in `tag` elements, one wrapper
    /// per covered segment. Returns the wrappers in document order.
    pub fn wrap_range(
        &mut self,
        map: &PositionMap,
        start: usize,
        end: usize,
        tag: &str,
        attrs: Vec<Attr>,
    ) -> Result<Vec<NodeId>, DocError> {
        self.ensure_current(map)?;
        if start >= end || !on_boundary(map, start) || !on_boundary(map, end) {
            return Err(DocError::InvalidRange { start, end });
        }
        let covered: Vec<_> = map
            .entries()
            .iter()
            .filter(|e| e.start < end && e.end > start)
            .copied()
            .collect();
        let mut wrappers = Vec::new();
        for entry in covered {
            let from = start.max(entry.start) - entry.start;
            let to = end.min(entry.end) - entry.start;
            let mid = self.isolate(entry.segment, from, to)?;
            let parent = self.parent(mid).ok_or(DocError::NodeDetached(mid))?;
            let idx = self.child_index(mid).ok_or(DocError::NodeDetached(mid))?;
            let wrapper = self.create_element(tag, attrs.clone());
            self.insert_child(parent, idx, wrapper);
            self.append_child(wrapper, mid);
            wrappers.push(wrapper);
        }
        Ok(wrappers)
    }

    /// Split `seg` so that `[from, to)` becomes its own segment; returns it.
    fn isolate(&mut self, seg: NodeId, from: usize, to: usize) -> Result<NodeId, DocError> {
        let text = self.text(seg).unwrap_or_default().to_string();
        if to < text.len() {
            let tail = self.create_text(&text[to..]);
            self.insert_after(seg, tail)?;
        }
        if from == 0 {
            self.set_text(seg, &text[..to]);
            return Ok(seg);
        }
        let mid = self.create_text(&text[from..to]);
        self.insert_after(seg, mid)?;
        self.set_text(seg, &text[..from]);
        Ok(mid)
    }

    /// Change the tag of the block containing the caret. Inline content
    /// sitting directly under the root is wrapped in a new block instead.
    pub fn set_block_tag(
        &mut self,
        map: &PositionMap,
        at: usize,
        tag: &str,
    ) -> Result<NodeId, DocError> {
        self.ensure_current(map)?;
        let point = map.resolve_caret(at).ok_or(DocError::Unaddressable(at))?;
        self.ensure_attached(point)?;
        let block = self
            .ancestors(point.segment)
            .into_iter()
            .find(|n| self.is_block(*n));
        if let Some(block) = block {
            self.set_tag(block, tag);
            return Ok(block);
        }
        let root = self.root();
        let top = self
            .ancestors(point.segment)
            .into_iter()
            .rev()
            .nth(1)
            .unwrap_or(point.segment);
        let idx = self.child_index(top).ok_or(DocError::NodeDetached(top))?;
        let wrapper = self.create_element(tag, Vec::new());
        self.insert_child(root, idx, wrapper);
        self.append_child(wrapper, top);
        Ok(wrapper)
    }
}

/// Offsets must land on a character boundary inside the flattened text.
fn on_boundary(map: &PositionMap, offset: usize) -> bool {
    map.full_text().is_char_boundary(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{from_markup, to_markup};
    use pretty_assertions::assert_eq;

    fn replaced(markup: &str, start: usize, end: usize, with: &str) -> String {
        let mut doc = from_markup(markup);
        let map = PositionMap::build(&doc);
        doc.replace_range(&map, start, end, with).unwrap();
        to_markup(&doc)
    }

    #[test]
    fn replace_inside_one_segment() {
        assert_eq!(replaced("<p>cat sat</p>", 0, 3, "dog"), "<p>dog sat</p>");
    }

    #[test]
    fn replace_across_inline_boundary_removes_covered_element() {
        // "ab" + "cd" + "ef"; replace "bcde"
        assert_eq!(replaced("<p>ab<em>cd</em>ef</p>", 1, 5, "X"), "<p>aXf</p>");
    }

    #[test]
    fn replace_keeps_partially_covered_ancestor() {
        // "ab" + "cd" + "ef"; replace "bc" leaves the <em> holding "d"
        assert_eq!(
            replaced("<p>ab<em>cd</em>ef</p>", 1, 3, "X"),
            "<p>aX<em>d</em>ef</p>"
        );
    }

    #[test]
    fn replace_across_blocks_removes_fully_covered_nodes() {
        // "one\ntwo\nthree\n"
        assert_eq!(
            replaced("<p>one</p><p>two</p><p>three</p>", 1, 10, "-"),
            "<p>o-</p><p>ree</p>"
        );
    }

    #[test]
    fn empty_replacement_deletes() {
        assert_eq!(replaced("<p>hello</p>", 0, 5, ""), "<p></p>");
    }

    #[test]
    fn stale_map_is_rejected_without_mutation() {
        let mut doc = from_markup("<p>hello</p>");
        let map = PositionMap::build(&doc);
        doc.insert_text(&map, 5, "!").unwrap();
        let before = to_markup(&doc);
        let err = doc.replace_range(&map, 0, 1, "J").unwrap_err();
        assert!(matches!(err, DocError::StaleMap { .. }));
        assert_eq!(to_markup(&doc), before);
    }

    #[test]
    fn insert_text_extends_segment() {
        let mut doc = from_markup("<p>helo</p>");
        let map = PositionMap::build(&doc);
        doc.insert_text(&map, 3, "l").unwrap();
        assert_eq!(to_markup(&doc), "<p>hello</p>");
    }

    #[test]
    fn insert_text_into_empty_document_lands_in_last_block() {
        let mut doc = from_markup("<p></p>");
        let map = PositionMap::build(&doc);
        doc.insert_text(&map, 0, "first").unwrap();
        assert_eq!(to_markup(&doc), "<p>first</p>");
    }

    #[test]
    fn fragment_insert_splits_segment() {
        let mut doc = from_markup("<p>headtail</p>");
        let frag = Document::fragment_from_plain_text("a\nb");
        let map = PositionMap::build(&doc);
        doc.insert_fragment(&map, 4, &frag).unwrap();
        assert_eq!(to_markup(&doc), "<p>heada<br>btail</p>");
    }

    #[test]
    fn wrap_range_per_segment() {
        let mut doc = from_markup("<p>one two</p>");
        let map = PositionMap::build(&doc);
        let wrappers = doc.wrap_range(&map, 4, 7, "strong", Vec::new()).unwrap();
        assert_eq!(wrappers.len(), 1);
        assert_eq!(to_markup(&doc), "<p>one <strong>two</strong></p>");
    }

    #[test]
    fn set_block_tag_changes_enclosing_block() {
        let mut doc = from_markup("<p>title</p><p>body</p>");
        let map = PositionMap::build(&doc);
        doc.set_block_tag(&map, 2, "h1").unwrap();
        assert_eq!(to_markup(&doc), "<h1>title</h1><p>body</p>");
    }

    #[test]
    fn set_block_tag_wraps_bare_inline_content() {
        let mut doc = from_markup("loose <em>text</em>");
        let map = PositionMap::build(&doc);
        doc.set_block_tag(&map, 8, "blockquote").unwrap();
        assert_eq!(to_markup(&doc), "loose <blockquote><em>text</em></blockquote>");
    }

    #[test]
    fn replace_ranges_descending_in_one_segment() {
        let mut doc = from_markup("<p>cat sat on the cat mat</p>");
        let map = PositionMap::build(&doc);
        let n = doc.replace_ranges(&map, &[(0, 3), (15, 18)], "dog").unwrap();
        assert_eq!(n, 2);
        assert_eq!(to_markup(&doc), "<p>dog sat on the dog mat</p>");
    }

    #[test]
    fn replace_ranges_rejects_overlap() {
        let mut doc = from_markup("<p>aaaa</p>");
        let map = PositionMap::build(&doc);
        let err = doc.replace_ranges(&map, &[(0, 2), (1, 3)], "b").unwrap_err();
        assert!(matches!(err, DocError::InvalidRange { .. }));
        assert_eq!(to_markup(&doc), "<p>aaaa</p>");
    }

    #[test]
    fn image_requires_data_uri() {
        let mut doc = from_markup("<p>x</p>");
        let map = PositionMap::build(&doc);
        assert_eq!(
            doc.insert_image(&map, 1, "https://example.com/a.png"),
            Err(DocError::InvalidImage)
        );
        doc.insert_image(&map, 1, "data:image/png;base64,AA==").unwrap();
        assert_eq!(
            to_markup(&doc),
            "<p>x<img src=\"data:image/png;base64,AA==\"></p>"
        );
    }
}
