// SPDX-License-Identifier: MIT
//
// Output buffering and stateful cell rendering.
//
//   OutputBuffer: accumulates a whole frame of ANSI bytes so it reaches
//   the terminal in a single write() call.
//
//   CellWriter: remembers what the terminal currently has active (cursor
//   position, colors, attributes, open hyperlink) and emits only the
//   escape sequences that change something.

use std::io::{self, Write};

use crate::ansi;
use crate::buffer::FrameBuffer;
use crate::cell::{Attr, Cell};
use crate::color::CellColor;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

const DEFAULT_CAPACITY: usize = 16_384;

/// A byte buffer that collects one frame of terminal output.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Clear for reuse, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write everything to stdout and clear.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush_stdout(&mut self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        self.flush_to(&mut stdout)
    }

    /// Write everything to `w` and clear.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails. The buffer keeps its
    /// contents in that case.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing happens in flush_stdout() / flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Stateful cell renderer.
///
/// - Cursor moves are skipped when the next cell is directly right of the
///   last one written.
/// - An attribute change resets (SGR 0) and re-emits, which invalidates
///   tracked colors. Going from no attributes to some skips the reset.
/// - Colors are re-emitted only when they change.
/// - A hyperlink stays open across consecutive cells with the same slot
///   and is closed before any cell with a different one.
#[allow(clippy::struct_field_names)]
pub struct CellWriter {
    last_x: i32,
    last_y: i32,
    last_fg: Option<CellColor>,
    last_bg: Option<CellColor>,
    last_attrs: Attr,
    last_link: u16,
}

impl CellWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_x: -1,
            last_y: -1,
            last_fg: None,
            last_bg: None,
            last_attrs: Attr::empty(),
            last_link: 0,
        }
    }

    /// Forget all tracked state. Call after a reset or screen clear.
    pub const fn reset_state(&mut self) {
        *self = Self::new();
    }

    /// Render one cell of `frame` at `(x, y)`.
    pub fn render_cell(&mut self, out: &mut OutputBuffer, frame: &FrameBuffer, x: u16, y: u16, cell: &Cell) {
        let xi = i32::from(x);
        let yi = i32::from(y);

        if cell.is_continuation() {
            // The wide cluster just drawn at x-1 already covers this column.
            if xi > 0 && self.last_x == xi - 1 && self.last_y == yi {
                self.last_x = xi;
                return;
            }
            if yi != self.last_y || xi != self.last_x + 1 {
                ansi::cursor_to(out, x, y).ok();
            }
            self.apply_style(out, frame, cell);
            out.buf.push(b' ');
            self.last_x = xi;
            self.last_y = yi;
            return;
        }

        if yi != self.last_y || xi != self.last_x + 1 {
            ansi::cursor_to(out, x, y).ok();
        }

        self.apply_style(out, frame, cell);
        out.push_str(cell.symbol());

        self.last_x = xi;
        self.last_y = yi;
    }

    /// Close any open hyperlink. Call once after the last cell of a frame.
    pub fn finish(&mut self, out: &mut OutputBuffer) {
        if self.last_link != 0 {
            ansi::hyperlink_close(out).ok();
            self.last_link = 0;
        }
    }

    fn apply_style(&mut self, out: &mut OutputBuffer, frame: &FrameBuffer, cell: &Cell) {
        if cell.link != self.last_link {
            if self.last_link != 0 {
                ansi::hyperlink_close(out).ok();
            }
            match frame.link(cell.link) {
                Some(link) => {
                    ansi::hyperlink_open(out, &link.url, link.id.as_deref()).ok();
                    self.last_link = cell.link;
                }
                None => self.last_link = 0,
            }
        }

        if cell.attrs != self.last_attrs {
            if !self.last_attrs.is_empty() {
                ansi::reset(out).ok();
                self.last_fg = None;
                self.last_bg = None;
            }
            self.last_attrs = cell.attrs;
            ansi::attrs(out, cell.attrs).ok();
        }

        if self.last_fg != Some(cell.fg) {
            ansi::fg(out, cell.fg).ok();
            self.last_fg = Some(cell.fg);
        }

        if self.last_bg != Some(cell.bg) {
            ansi::bg(out, cell.bg).ok();
            self.last_bg = Some(cell.bg);
        }
    }
}

impl Default for CellWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
