// SPDX-License-Identifier: MIT
//
// FrameBuffer: the 2D cell grid the compositor paints into.
//
// Design:
//
//   - Flat `Vec<Cell>` with row-major indexing. A row's cells are
//     contiguous, so the diff renderer's left-to-right scan is linear.
//
//   - Paint operations take signed coordinates and an optional `ClipRect`.
//     Content positioned partly off-screen (negative offsets from layout or
//     scrolling) clips per cell instead of wrapping or being rejected.
//
//   - Text is written one grapheme cluster at a time using the width
//     service. Width-2 clusters write a continuation cell in the next
//     column. A wide cluster that would straddle the right edge becomes a
//     single space.
//
//   - Hyperlinks are interned per buffer. Cells carry a `u16` slot; slot 0
//     is "no link". The table is cleared with the cells.
//
//   - Resize keeps the overlapping region so a shrinking or growing
//     terminal does not flash blank before the next paint.

use crate::cell::{Attr, Cell, Grapheme};
use crate::color::CellColor;
use crate::width;

// ─── ClipRect ────────────────────────────────────────────────────────────────

/// A clipping rectangle. Coordinates are signed to allow scrolled content.
///
/// # Examples
///
/// ```
/// use weft_term::buffer::ClipRect;
///
/// let clip = ClipRect::new(10, 5, 80, 24);
/// assert!(clip.contains(10, 5));
/// assert!(clip.contains(89, 28));
/// assert!(!clip.contains(9, 5));
/// assert!(!clip.contains(90, 5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl ClipRect {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn right(self) -> i32 {
        self.x + self.width as i32
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.y + self.height as i32
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// The overlap of two rectangles, or `None` when they don't touch.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            // Both differences are positive and bounded by u16 extents.
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            Some(Self {
                x: x1,
                y: y1,
                width: (x2 - x1) as u16,
                height: (y2 - y1) as u16,
            })
        } else {
            None
        }
    }
}

// ─── Hyperlink ───────────────────────────────────────────────────────────────

/// An OSC 8 hyperlink target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hyperlink {
    pub url: String,
    /// Optional `id=` parameter. Cells sharing an id highlight together.
    pub id: Option<String>,
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Resolved paint style for a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStyle {
    pub fg: CellColor,
    pub bg: CellColor,
    pub attrs: Attr,
    pub link: u16,
}

impl CellStyle {
    #[inline]
    #[must_use]
    pub const fn new(fg: CellColor, bg: CellColor, attrs: Attr) -> Self {
        Self { fg, bg, attrs, link: 0 }
    }

    #[inline]
    #[must_use]
    pub const fn with_link(self, link: u16) -> Self {
        Self { link, ..self }
    }

    #[inline]
    const fn cell(self, grapheme: Grapheme) -> Cell {
        Cell {
            grapheme,
            fg: self.fg,
            bg: self.bg,
            attrs: self.attrs,
            link: self.link,
        }
    }
}

// ─── FrameBuffer ─────────────────────────────────────────────────────────────

/// A 2D grid of cells, row-major: `index = y * width + x`.
///
/// # Examples
///
/// ```
/// use weft_term::buffer::{CellStyle, FrameBuffer};
///
/// let mut buf = FrameBuffer::new(10, 2);
/// buf.write_text(0, 0, "hi中", CellStyle::default(), None);
/// assert_eq!(buf.get(2, 0).unwrap().symbol(), "中");
/// assert!(buf.get(3, 0).unwrap().is_continuation());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    links: Vec<Hyperlink>,
}

impl FrameBuffer {
    // ─── Construction ────────────────────────────────────────────────────

    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let size = usize::from(width) * usize::from(height);
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; size],
            links: Vec::new(),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// The full buffer as a [`ClipRect`].
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> ClipRect {
        ClipRect::new(0, 0, self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Map signed coordinates to unsigned ones when they land in the buffer.
    #[inline]
    fn screen_pos(&self, x: i32, y: i32) -> Option<(u16, u16)> {
        let x = u16::try_from(x).ok()?;
        let y = u16::try_from(y).ok()?;
        self.in_bounds(x, y).then_some((x, y))
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// One row as a slice, or `None` past the bottom.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y < self.height {
            let start = self.index(0, y);
            Some(&self.cells[start..start + usize::from(self.width)])
        } else {
            None
        }
    }

    /// The visible text of one row, continuation cells skipped.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        self.row(y)
            .map(|row| row.iter().map(Cell::symbol).collect())
            .unwrap_or_default()
    }

    // ─── Hyperlinks ──────────────────────────────────────────────────────

    /// Intern a hyperlink and return its cell slot (never 0).
    ///
    /// Returns 0 (no link) once the table is full.
    pub fn intern_link(&mut self, url: &str, id: Option<&str>) -> u16 {
        if let Some(pos) = self
            .links
            .iter()
            .position(|l| l.url == url && l.id.as_deref() == id)
        {
            return u16::try_from(pos + 1).unwrap_or(0);
        }
        let Ok(slot) = u16::try_from(self.links.len() + 1) else {
            return 0;
        };
        self.links.push(Hyperlink {
            url: url.to_owned(),
            id: id.map(str::to_owned),
        });
        slot
    }

    /// The interned hyperlink table, slot 1 first.
    #[inline]
    #[must_use]
    pub fn links(&self) -> &[Hyperlink] {
        &self.links
    }

    /// The hyperlink behind a cell slot.
    #[must_use]
    pub fn link(&self, slot: u16) -> Option<&Hyperlink> {
        if slot == 0 {
            return None;
        }
        self.links.get(usize::from(slot) - 1)
    }

    // ─── Clear & Resize ──────────────────────────────────────────────────

    /// Reset every cell to empty and drop the hyperlink table.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
        self.links.clear();
    }

    /// Resize, keeping the region both sizes share.
    ///
    /// New cells are empty. A wide cluster cut in half by the new right
    /// edge becomes a space.
    pub fn resize(&mut self, width: u16, height: u16) {
        if width == self.width && height == self.height {
            return;
        }
        let mut next = vec![Cell::EMPTY; usize::from(width) * usize::from(height)];
        let keep_w = usize::from(width.min(self.width));
        let keep_h = height.min(self.height);
        for y in 0..keep_h {
            let src = self.index(0, y);
            let dst = usize::from(y) * usize::from(width);
            next[dst..dst + keep_w].copy_from_slice(&self.cells[src..src + keep_w]);
            if keep_w > 0 && keep_w < usize::from(self.width) {
                let last = dst + keep_w - 1;
                let cut = self.cells[src + keep_w].is_continuation();
                if cut && !next[last].is_continuation() {
                    next[last].grapheme = Grapheme::SPACE;
                }
            }
        }
        self.width = width;
        self.height = height;
        self.cells = next;
    }

    /// Copy all cells from another buffer of the same size.
    ///
    /// Returns `false` (and copies nothing) when sizes differ.
    pub fn copy_from(&mut self, other: &Self) -> bool {
        if self.width != other.width || self.height != other.height {
            return false;
        }
        self.cells.copy_from_slice(&other.cells);
        self.links.clone_from(&other.links);
        true
    }

    // ─── Wide Character Cleanup ──────────────────────────────────────────

    /// Break any wide cluster that touches `(x, y)` before it is overwritten.
    fn break_wide_char_at(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);

        if self.cells[idx].is_continuation() && x > 0 {
            let prev = self.index(x - 1, y);
            self.cells[prev].grapheme = Grapheme::SPACE;
        }

        if x + 1 < self.width {
            let next = self.index(x + 1, y);
            if self.cells[next].is_continuation() {
                self.cells[next] = Cell {
                    grapheme: Grapheme::SPACE,
                    ..self.cells[next]
                };
            }
        }
    }

    // ─── Paint ───────────────────────────────────────────────────────────

    /// Write one cell. Out-of-bounds or clipped positions are ignored.
    ///
    /// Returns `true` when the cell was written.
    pub fn set_cell(&mut self, x: i32, y: i32, ch: char, style: CellStyle, clip: Option<&ClipRect>) -> bool {
        self.put(x, y, Grapheme::from_char(ch), style, clip)
    }

    fn put(&mut self, x: i32, y: i32, g: Grapheme, style: CellStyle, clip: Option<&ClipRect>) -> bool {
        if clip.is_some_and(|c| !c.contains(x, y)) {
            return false;
        }
        let Some((sx, sy)) = self.screen_pos(x, y) else {
            return false;
        };
        self.break_wide_char_at(sx, sy);
        let idx = self.index(sx, sy);
        self.cells[idx] = style.cell(g);
        true
    }

    /// Fill a rectangle with spaces in the given style.
    pub fn fill_rect(&mut self, rect: ClipRect, style: CellStyle, clip: Option<&ClipRect>) {
        let Some(mut area) = rect.intersect(self.bounds()) else {
            return;
        };
        if let Some(clip) = clip {
            let Some(clipped) = area.intersect(*clip) else {
                return;
            };
            area = clipped;
        }

        // Intersection with the buffer bounds (origin 0,0) keeps these
        // non-negative and within u16.
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let (x1, y1, x2, y2) = (
            area.x as u16,
            area.y as u16,
            area.right() as u16,
            area.bottom() as u16,
        );

        for row in y1..y2 {
            self.break_wide_char_at(x1, row);
            self.break_wide_char_at(x2 - 1, row);
            let start = self.index(x1, row);
            let end = self.index(x2, row);
            self.cells[start..end].fill(style.cell(Grapheme::SPACE));
        }
    }

    /// Write `text` left to right from `(x, y)`, one grapheme per cell.
    ///
    /// Zero-width clusters are skipped. Returns the columns consumed,
    /// including columns that were clipped away.
    pub fn write_text(&mut self, x: i32, y: i32, text: &str, style: CellStyle, clip: Option<&ClipRect>) -> u16 {
        let mut col = x;
        let right = i32::from(self.width);

        for (g, w) in width::graphemes_with_width(text) {
            if col >= right {
                break;
            }
            if w == 0 {
                continue;
            }

            if w == 2 && col + 1 >= right {
                self.put(col, y, Grapheme::SPACE, style, clip);
                col += 1;
                break;
            }

            self.put(col, y, Grapheme::new(g), style, clip);
            if w == 2 {
                let cont = Cell::continuation(style.fg, style.bg, style.attrs).with_link(style.link);
                if clip.is_none_or(|c| c.contains(col + 1, y)) {
                    if let Some((cx, cy)) = self.screen_pos(col + 1, y) {
                        self.break_wide_char_at(cx, cy);
                        let idx = self.index(cx, cy);
                        self.cells[idx] = cont;
                    }
                }
            }
            col += i32::try_from(w).unwrap_or(1);
        }

        u16::try_from(col.saturating_sub(x).max(0)).unwrap_or(u16::MAX)
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameBuffer({}x{})", self.width, self.height)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain() -> CellStyle {
        CellStyle::default()
    }

    // ── ClipRect ────────────────────────────────────────────────────────

    #[test]
    fn clip_rect_edges() {
        let clip = ClipRect::new(10, 20, 80, 24);
        assert_eq!(clip.right(), 90);
        assert_eq!(clip.bottom(), 44);
        assert!(!ClipRect::new(0, 0, 0, 5).contains(0, 0));
    }

    #[test]
    fn clip_rect_negative_origin() {
        let clip = ClipRect::new(-5, -3, 20, 10);
        assert!(clip.contains(0, 0));
        assert!(clip.contains(-5, -3));
        assert!(!clip.contains(15, 0));
    }

    #[test]
    fn clip_rect_intersect() {
        let a = ClipRect::new(0, 0, 20, 20);
        let b = ClipRect::new(10, 10, 20, 20);
        assert_eq!(a.intersect(b), Some(ClipRect::new(10, 10, 10, 10)));
        assert_eq!(ClipRect::new(0, 0, 10, 10).intersect(ClipRect::new(10, 0, 10, 10)), None);
    }

    // ── Construction & resize ───────────────────────────────────────────

    #[test]
    fn new_is_all_empty() {
        let buf = FrameBuffer::new(4, 3);
        assert_eq!(buf.cells().len(), 12);
        assert!(buf.cells().iter().all(Cell::is_empty));
    }

    #[test]
    fn zero_size_buffer() {
        let mut buf = FrameBuffer::new(0, 0);
        assert!(buf.cells().is_empty());
        buf.write_text(0, 0, "abc", plain(), None);
        buf.fill_rect(ClipRect::new(0, 0, 3, 3), plain(), None);
        assert!(buf.get(0, 0).is_none());
    }

    #[test]
    fn resize_preserves_overlap() {
        let mut buf = FrameBuffer::new(5, 2);
        buf.write_text(0, 0, "abcde", plain(), None);
        buf.write_text(0, 1, "fghij", plain(), None);

        buf.resize(3, 3);
        assert_eq!(buf.width(), 3);
        assert_eq!(buf.height(), 3);
        assert_eq!(buf.row_text(0), "abc");
        assert_eq!(buf.row_text(1), "fgh");
        assert_eq!(buf.row_text(2), "   ");

        buf.resize(6, 1);
        assert_eq!(buf.row_text(0), "abc   ");
    }

    #[test]
    fn resize_cutting_wide_char_leaves_space() {
        let mut buf = FrameBuffer::new(4, 1);
        buf.write_text(0, 0, "a中", plain(), None);
        buf.resize(2, 1);
        assert_eq!(buf.row_text(0), "a ");
    }

    #[test]
    fn clear_drops_links() {
        let mut buf = FrameBuffer::new(2, 1);
        let slot = buf.intern_link("https://example.com", None);
        assert_eq!(slot, 1);
        buf.clear();
        assert!(buf.link(1).is_none());
    }

    // ── Cells ───────────────────────────────────────────────────────────

    #[test]
    fn set_cell_out_of_bounds_is_ignored() {
        let mut buf = FrameBuffer::new(3, 3);
        assert!(!buf.set_cell(-1, 0, 'x', plain(), None));
        assert!(!buf.set_cell(3, 0, 'x', plain(), None));
        assert!(!buf.set_cell(0, 3, 'x', plain(), None));
        assert!(buf.set_cell(2, 2, 'x', plain(), None));
        assert_eq!(buf.get(2, 2).unwrap().symbol(), "x");
    }

    #[test]
    fn set_cell_respects_clip() {
        let mut buf = FrameBuffer::new(5, 5);
        let clip = ClipRect::new(1, 1, 2, 2);
        assert!(!buf.set_cell(0, 0, 'x', plain(), Some(&clip)));
        assert!(buf.set_cell(1, 1, 'x', plain(), Some(&clip)));
    }

    #[test]
    fn overwriting_continuation_breaks_wide_char() {
        let mut buf = FrameBuffer::new(4, 1);
        buf.write_text(0, 0, "中", plain(), None);
        buf.set_cell(1, 0, 'x', plain(), None);
        assert_eq!(buf.row_text(0), " x  ");
    }

    // ── Text ────────────────────────────────────────────────────────────

    #[test]
    fn write_text_ascii() {
        let mut buf = FrameBuffer::new(8, 1);
        let used = buf.write_text(1, 0, "hey", plain(), None);
        assert_eq!(used, 3);
        assert_eq!(buf.row_text(0), " hey    ");
    }

    #[test]
    fn write_text_keeps_clusters_in_one_cell() {
        let mut buf = FrameBuffer::new(4, 1);
        buf.write_text(0, 0, "e\u{301}x", plain(), None);
        assert_eq!(buf.get(0, 0).unwrap().symbol(), "e\u{301}");
        assert_eq!(buf.get(1, 0).unwrap().symbol(), "x");
    }

    #[test]
    fn write_text_wide_char_at_edge_becomes_space() {
        let mut buf = FrameBuffer::new(3, 1);
        let used = buf.write_text(0, 0, "ab中", plain(), None);
        assert_eq!(used, 3);
        assert_eq!(buf.row_text(0), "ab ");
    }

    #[test]
    fn write_text_negative_x_clips_leading_cells() {
        let mut buf = FrameBuffer::new(4, 1);
        buf.write_text(-2, 0, "abcdef", plain(), None);
        assert_eq!(buf.row_text(0), "cdef");
    }

    #[test]
    fn write_text_with_clip() {
        let mut buf = FrameBuffer::new(6, 1);
        let clip = ClipRect::new(2, 0, 2, 1);
        buf.write_text(0, 0, "abcdef", plain(), Some(&clip));
        assert_eq!(buf.row_text(0), "  cd  ");
    }

    #[test]
    fn write_text_carries_style_and_link() {
        let mut buf = FrameBuffer::new(4, 1);
        let link = buf.intern_link("https://a.b", Some("x"));
        let style = CellStyle::new(CellColor::Rgb(1, 1, 1), CellColor::Default, Attr::BOLD).with_link(link);
        buf.write_text(0, 0, "中", style, None);
        assert_eq!(buf.get(0, 0).unwrap().link, link);
        assert_eq!(buf.get(1, 0).unwrap().link, link);
        assert_eq!(buf.link(link).unwrap().url, "https://a.b");
    }

    #[test]
    fn intern_link_deduplicates() {
        let mut buf = FrameBuffer::new(1, 1);
        let a = buf.intern_link("u", None);
        let b = buf.intern_link("u", None);
        let c = buf.intern_link("u", Some("id"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    // ── Fill ────────────────────────────────────────────────────────────

    #[test]
    fn fill_rect_clipped_to_bounds() {
        let mut buf = FrameBuffer::new(4, 2);
        let style = CellStyle::new(CellColor::Default, CellColor::Ansi256(4), Attr::empty());
        buf.fill_rect(ClipRect::new(2, -1, 10, 10), style, None);
        assert_eq!(buf.get(1, 0).unwrap().bg, CellColor::Default);
        assert_eq!(buf.get(2, 0).unwrap().bg, CellColor::Ansi256(4));
        assert_eq!(buf.get(3, 1).unwrap().bg, CellColor::Ansi256(4));
    }

    #[test]
    fn fill_rect_outside_does_nothing() {
        let mut buf = FrameBuffer::new(4, 2);
        buf.fill_rect(ClipRect::new(10, 10, 2, 2), plain().with_link(1), None);
        assert!(buf.cells().iter().all(Cell::is_empty));
    }
}
