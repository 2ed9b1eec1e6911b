//! Windowing for long lists of fixed-height items.
//!
//! Only items intersecting the viewport (plus `overscan` on each side) need
//! nodes. Every mutator ends in [`VirtualList::update`], the one place the
//! derived fields are computed, so the range and clamps never go stale.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualList {
    item_count: usize,
    item_height: u16,
    viewport_height: u16,
    overscan: usize,
    scroll_offset: f32,
    visible_start: usize,
    visible_end: usize,
    max_scroll: f32,
}

impl VirtualList {
    /// A list scrolled to the top. An item height of zero is treated as one.
    #[must_use]
    pub fn new(item_count: usize, item_height: u16, viewport_height: u16, overscan: usize) -> Self {
        let mut list = Self {
            item_count,
            item_height: item_height.max(1),
            viewport_height,
            overscan,
            scroll_offset: 0.0,
            visible_start: 0,
            visible_end: 0,
            max_scroll: 0.0,
        };
        list.update();
        list
    }

    /// Recompute the scroll clamp and the visible range.
    pub fn update(&mut self) {
        let h = f32::from(self.item_height);
        let viewport = f32::from(self.viewport_height);
        let total = to_f32(self.item_count) * h;

        self.max_scroll = (total - viewport).max(0.0);
        self.scroll_offset = self.scroll_offset.clamp(0.0, self.max_scroll);

        let first = to_index((self.scroll_offset / h).floor());
        let last = to_index(((self.scroll_offset + viewport) / h).ceil());
        self.visible_start = first.saturating_sub(self.overscan).min(self.item_count);
        self.visible_end = last.saturating_add(self.overscan).min(self.item_count);
    }

    // ---------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------

    /// Items to materialize.
    #[must_use]
    pub const fn visible_range(&self) -> Range<usize> {
        self.visible_start..self.visible_end
    }

    /// Row of item `index` relative to the viewport top. Negative above it.
    #[must_use]
    pub fn item_offset(&self, index: usize) -> f32 {
        to_f32(index) * f32::from(self.item_height) - self.scroll_offset
    }

    #[must_use]
    pub const fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    #[must_use]
    pub const fn max_scroll(&self) -> f32 {
        self.max_scroll
    }

    #[must_use]
    pub const fn item_count(&self) -> usize {
        self.item_count
    }

    #[must_use]
    pub const fn item_height(&self) -> u16 {
        self.item_height
    }

    #[must_use]
    pub const fn viewport_height(&self) -> u16 {
        self.viewport_height
    }

    #[must_use]
    pub const fn overscan(&self) -> usize {
        self.overscan
    }

    #[must_use]
    pub fn is_at_bottom(&self) -> bool {
        self.max_scroll - self.scroll_offset < 0.5
    }

    // ---------------------------------------------------------------------------
    // Scrolling
    // ---------------------------------------------------------------------------

    pub fn scroll_to(&mut self, offset: f32) {
        self.scroll_offset = if offset.is_finite() { offset } else { 0.0 };
        self.update();
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.scroll_to(self.scroll_offset + delta);
    }

    /// Scroll by whole items; negative moves up.
    pub fn scroll_items(&mut self, items: i32) {
        #[allow(clippy::cast_precision_loss)]
        let delta = items as f32 * f32::from(self.item_height);
        self.scroll_by(delta);
    }

    /// Scroll the least distance that brings item `index` fully into view.
    pub fn ensure_visible(&mut self, index: usize) {
        if index >= self.item_count {
            return;
        }
        let h = f32::from(self.item_height);
        let top = to_f32(index) * h;
        let bottom = top + h;
        let viewport = f32::from(self.viewport_height);

        if top < self.scroll_offset {
            self.scroll_offset = top;
        } else if bottom > self.scroll_offset + viewport {
            self.scroll_offset = bottom - viewport;
        }
        self.update();
    }

    pub fn page_up(&mut self) {
        self.scroll_by(-f32::from(self.viewport_height));
    }

    pub fn page_down(&mut self) {
        self.scroll_by(f32::from(self.viewport_height));
    }

    pub fn scroll_top(&mut self) {
        self.scroll_to(0.0);
    }

    pub fn scroll_bottom(&mut self) {
        self.scroll_to(self.max_scroll);
    }

    // ---------------------------------------------------------------------------
    // Setters
    // ---------------------------------------------------------------------------

    pub fn set_count(&mut self, count: usize) {
        self.item_count = count;
        self.update();
    }

    pub fn set_viewport(&mut self, height: u16) {
        self.viewport_height = height;
        self.update();
    }

    pub fn set_item_height(&mut self, height: u16) {
        self.item_height = height.max(1);
        self.update();
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.overscan = overscan;
        self.update();
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f32(n: usize) -> f32 {
    n as f32
}

// Callers pass non-negative, already floored or ceiled values.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_index(v: f32) -> usize {
    v.max(0.0) as usize
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn initial_range_covers_viewport_plus_overscan() {
        let list = VirtualList::new(100, 1, 10, 2);
        assert_eq!(list.visible_range(), 0..12);
        assert!(close(list.max_scroll(), 90.0));
    }

    #[test]
    fn short_list_cannot_scroll() {
        let mut list = VirtualList::new(3, 1, 10, 0);
        list.scroll_by(5.0);
        assert!(close(list.scroll_offset(), 0.0));
        assert_eq!(list.visible_range(), 0..3);
        assert!(list.is_at_bottom());
    }

    #[test]
    fn scroll_clamps_both_ends() {
        let mut list = VirtualList::new(50, 2, 10, 0);
        list.scroll_to(-5.0);
        assert!(close(list.scroll_offset(), 0.0));
        list.scroll_to(1000.0);
        assert!(close(list.scroll_offset(), 90.0));
        assert_eq!(list.visible_range(), 45..50);
    }

    #[test]
    fn scroll_items_moves_by_item_height() {
        let mut list = VirtualList::new(50, 3, 9, 0);
        list.scroll_items(2);
        assert!(close(list.scroll_offset(), 6.0));
        assert_eq!(list.visible_range(), 2..5);
        list.scroll_items(-5);
        assert!(close(list.scroll_offset(), 0.0));
    }

    #[test]
    fn ensure_visible_moves_minimally() {
        let mut list = VirtualList::new(100, 1, 10, 0);
        list.ensure_visible(5);
        assert!(close(list.scroll_offset(), 0.0));
        list.ensure_visible(20);
        assert!(close(list.scroll_offset(), 11.0));
        list.ensure_visible(15);
        assert!(close(list.scroll_offset(), 11.0));
        list.ensure_visible(3);
        assert!(close(list.scroll_offset(), 3.0));
    }

    #[test]
    fn paging_and_jumps() {
        let mut list = VirtualList::new(100, 1, 10, 0);
        list.page_down();
        assert!(close(list.scroll_offset(), 10.0));
        list.page_up();
        assert!(close(list.scroll_offset(), 0.0));
        list.scroll_bottom();
        assert!(list.is_at_bottom());
        list.scroll_top();
        assert!(close(list.scroll_offset(), 0.0));
    }

    #[test]
    fn zero_item_height_is_coerced() {
        let mut list = VirtualList::new(10, 0, 5, 0);
        assert_eq!(list.item_height(), 1);
        list.set_item_height(0);
        assert_eq!(list.item_height(), 1);
    }

    #[test]
    fn shrinking_count_reclamps() {
        let mut list = VirtualList::new(100, 1, 10, 1);
        list.scroll_bottom();
        list.set_count(20);
        assert!(close(list.scroll_offset(), 10.0));
        assert_eq!(list.visible_range(), 9..20);
    }

    #[test]
    fn item_offset_is_viewport_relative() {
        let mut list = VirtualList::new(100, 2, 10, 0);
        list.scroll_to(4.0);
        assert!(close(list.item_offset(2), 0.0));
        assert!(close(list.item_offset(0), -4.0));
    }

    #[test]
    fn empty_list() {
        let list = VirtualList::new(0, 1, 10, 3);
        assert_eq!(list.visible_range(), 0..0);
    }
}
