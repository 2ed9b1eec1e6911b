// SPDX-License-Identifier: MIT
//
// Differential renderer.
//
// Compares the current FrameBuffer with the previous one and emits ANSI only
// for cells that changed. Per frame:
//
//   1. The compositor paints the node tree into a FrameBuffer.
//   2. render() diffs it against the stored previous frame.
//   3. Changed cells go through CellWriter, which drops redundant cursor
//      moves and SGR codes.
//   4. Everything lands in one OutputBuffer; flush() is a single write().
//
// Unchanged rows are skipped with a single slice comparison. The frame is
// wrapped in synchronized output (DEC 2026). The first frame, and any frame
// whose size differs from the last, is a full redraw.
//
// Hyperlink slots are per-frame indices, so when the link table itself
// changed, every linked cell counts as changed.

use std::io::{self, Write};

use tracing::trace;

use crate::ansi;
use crate::buffer::FrameBuffer;
use crate::output::{CellWriter, OutputBuffer};

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// What one render pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub cells_rendered: usize,
    pub cells_skipped: usize,
    pub bytes_written: usize,
}

impl RenderStats {
    #[inline]
    #[must_use]
    pub const fn total_cells(&self) -> usize {
        self.cells_rendered + self.cells_skipped
    }
}

// ─── DiffRenderer ────────────────────────────────────────────────────────────

/// Emits ANSI for the cells that differ from the previous frame.
///
/// ```no_run
/// use weft_term::buffer::FrameBuffer;
/// use weft_term::diff::DiffRenderer;
///
/// let mut renderer = DiffRenderer::new();
/// let frame = FrameBuffer::new(80, 24);
/// let stats = renderer.render(&frame);
/// renderer.flush().unwrap();
/// assert_eq!(stats.cells_rendered, 80 * 24);
/// ```
pub struct DiffRenderer {
    output: OutputBuffer,
    writer: CellWriter,
    previous: Option<FrameBuffer>,
}

impl DiffRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: OutputBuffer::new(),
            writer: CellWriter::new(),
            previous: None,
        }
    }

    /// Diff `current` against the previous frame and buffer the output.
    pub fn render(&mut self, current: &FrameBuffer) -> RenderStats {
        self.output.clear();
        self.writer.reset_state();

        let width = current.width();
        let height = current.height();
        let mut stats = RenderStats::default();

        if width == 0 || height == 0 {
            self.store_frame(current);
            return stats;
        }

        ansi::begin_sync(&mut self.output).ok();

        let prev = self
            .previous
            .as_ref()
            .filter(|p| p.width() == width && p.height() == height);

        if prev.is_none() {
            ansi::clear_screen(&mut self.output).ok();
            ansi::cursor_to(&mut self.output, 0, 0).ok();
        }

        let links_changed = prev.is_some_and(|p| p.links() != current.links());

        for y in 0..height {
            let (Some(row), prev_row) = (current.row(y), prev.and_then(|p| p.row(y))) else {
                continue;
            };

            if let Some(prev_row) = prev_row {
                let row_linked = links_changed && row.iter().any(|c| c.link != 0);
                if row == prev_row && !row_linked {
                    stats.cells_skipped += usize::from(width);
                    continue;
                }
            }

            for (x, cell) in (0..width).zip(row) {
                let changed = prev_row.is_none_or(|p| {
                    p[usize::from(x)] != *cell || (links_changed && cell.link != 0)
                });
                if changed {
                    self.writer.render_cell(&mut self.output, current, x, y, cell);
                    stats.cells_rendered += 1;
                } else {
                    stats.cells_skipped += 1;
                }
            }
        }

        self.writer.finish(&mut self.output);
        ansi::reset(&mut self.output).ok();
        ansi::end_sync(&mut self.output).ok();

        stats.bytes_written = self.output.len();
        trace!(
            rendered = stats.cells_rendered,
            skipped = stats.cells_skipped,
            bytes = stats.bytes_written,
            "frame diffed"
        );

        self.store_frame(current);
        stats
    }

    /// The bytes produced by the last render.
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        self.output.as_bytes()
    }

    /// Write the buffered output to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush_stdout()
    }

    /// Write the buffered output to `w`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        self.output.flush_to(w)
    }

    /// Forget the previous frame so the next render redraws everything.
    pub fn force_redraw(&mut self) {
        self.previous = None;
    }

    fn store_frame(&mut self, current: &FrameBuffer) {
        if let Some(prev) = self.previous.as_mut() {
            if prev.copy_from(current) {
                return;
            }
        }
        self.previous = Some(current.clone());
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CellStyle;
    use crate::cell::Attr;
    use crate::color::CellColor;

    fn render_frame(renderer: &mut DiffRenderer, frame: &FrameBuffer) -> (RenderStats, String) {
        let stats = renderer.render(frame);
        let output = String::from_utf8(renderer.output_bytes().to_vec()).unwrap();
        (stats, output)
    }

    fn put(frame: &mut FrameBuffer, x: i32, y: i32, ch: char) {
        frame.set_cell(x, y, ch, CellStyle::default(), None);
    }

    // ── First render ────────────────────────────────────────────────────

    #[test]
    fn first_render_draws_all_cells() {
        let mut renderer = DiffRenderer::new();
        let (stats, output) = render_frame(&mut renderer, &FrameBuffer::new(10, 5));
        assert_eq!(stats.cells_rendered, 50);
        assert_eq!(stats.cells_skipped, 0);
        assert!(output.contains("\x1b[2J"));
        assert!(output.starts_with("\x1b[?2026h"));
        assert!(output.ends_with("\x1b[0m\x1b[?2026l"));
    }

    // ── Identical frames ────────────────────────────────────────────────

    #[test]
    fn identical_frames_skip_everything() {
        let mut renderer = DiffRenderer::new();
        let frame = FrameBuffer::new(10, 5);
        renderer.render(&frame);
        let (stats, output) = render_frame(&mut renderer, &frame);
        assert_eq!(stats.cells_rendered, 0);
        assert_eq!(stats.cells_skipped, 50);
        assert!(!output.contains("\x1b[2J"));
        assert!(stats.bytes_written < 30);
    }

    // ── Changes ─────────────────────────────────────────────────────────

    #[test]
    fn single_cell_change_renders_one() {
        let mut renderer = DiffRenderer::new();
        let mut frame = FrameBuffer::new(10, 5);
        renderer.render(&frame);

        put(&mut frame, 7, 4, 'Z');
        let (stats, output) = render_frame(&mut renderer, &frame);

        assert_eq!(stats.cells_rendered, 1);
        assert_eq!(stats.cells_skipped, 49);
        assert!(output.contains("\x1b[5;8H"));
        assert!(output.contains('Z'));
    }

    #[test]
    fn only_changed_row_is_scanned() {
        let mut renderer = DiffRenderer::new();
        let mut frame = FrameBuffer::new(100, 50);
        renderer.render(&frame);

        frame.write_text(0, 25, &"#".repeat(100), CellStyle::default(), None);
        let (stats, _) = render_frame(&mut renderer, &frame);

        assert_eq!(stats.cells_rendered, 100);
        assert_eq!(stats.cells_skipped, 4900);
    }

    #[test]
    fn styled_cell_emits_sgr() {
        let mut renderer = DiffRenderer::new();
        let mut frame = FrameBuffer::new(10, 1);
        renderer.render(&frame);

        let style = CellStyle::new(
            CellColor::Rgb(255, 0, 0),
            CellColor::Rgb(0, 0, 255),
            Attr::BOLD | Attr::ITALIC,
        );
        frame.set_cell(0, 0, 'E', style, None);
        let (_, output) = render_frame(&mut renderer, &frame);

        assert!(output.contains("\x1b[1;3m"));
        assert!(output.contains("\x1b[38;2;255;0;0m"));
        assert!(output.contains("\x1b[48;2;0;0;255m"));
    }

    // ── Resize & redraw ─────────────────────────────────────────────────

    #[test]
    fn size_change_is_full_redraw() {
        let mut renderer = DiffRenderer::new();
        renderer.render(&FrameBuffer::new(10, 5));
        let (stats, output) = render_frame(&mut renderer, &FrameBuffer::new(20, 10));
        assert_eq!(stats.cells_rendered, 200);
        assert!(output.contains("\x1b[2J"));
    }

    #[test]
    fn frame_after_resize_diffs_against_new_size() {
        let mut renderer = DiffRenderer::new();
        renderer.render(&FrameBuffer::new(10, 5));
        let mut frame = FrameBuffer::new(20, 10);
        renderer.render(&frame);
        put(&mut frame, 3, 3, 'z');
        let (stats, _) = render_frame(&mut renderer, &frame);
        assert_eq!(stats.cells_rendered, 1);
        assert_eq!(stats.cells_skipped, 199);
    }

    #[test]
    fn force_redraw_renders_everything() {
        let mut renderer = DiffRenderer::new();
        let frame = FrameBuffer::new(4, 2);
        renderer.render(&frame);
        renderer.force_redraw();
        let (stats, _) = render_frame(&mut renderer, &frame);
        assert_eq!(stats.cells_rendered, 8);
    }

    #[test]
    fn zero_size_buffer_produces_no_output() {
        let mut renderer = DiffRenderer::new();
        let (stats, _) = render_frame(&mut renderer, &FrameBuffer::new(0, 0));
        assert_eq!(stats, RenderStats::default());
    }

    // ── Hyperlinks ──────────────────────────────────────────────────────

    #[test]
    fn retargeted_link_rerenders_linked_cells() {
        let mut renderer = DiffRenderer::new();

        let mut a = FrameBuffer::new(4, 2);
        let slot = a.intern_link("https://one", None);
        a.write_text(0, 0, "ab", CellStyle::default().with_link(slot), None);
        renderer.render(&a);

        let mut b = FrameBuffer::new(4, 2);
        let slot = b.intern_link("https://two", None);
        b.write_text(0, 0, "ab", CellStyle::default().with_link(slot), None);
        let (stats, output) = render_frame(&mut renderer, &b);

        assert_eq!(stats.cells_rendered, 2);
        assert!(output.contains("https://two"));
    }

    #[test]
    fn consecutive_renders_track_state() {
        let mut renderer = DiffRenderer::new();
        let mut frame = FrameBuffer::new(10, 5);

        assert_eq!(renderer.render(&frame).cells_rendered, 50);
        assert_eq!(renderer.render(&frame).cells_rendered, 0);
        put(&mut frame, 0, 0, '!');
        assert_eq!(renderer.render(&frame).cells_rendered, 1);
        put(&mut frame, 0, 0, ' ');
        assert_eq!(renderer.render(&frame).cells_rendered, 1);
        assert_eq!(renderer.render(&frame).cells_rendered, 0);
    }
}
