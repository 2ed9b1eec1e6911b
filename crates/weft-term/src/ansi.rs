// SPDX-License-Identifier: MIT
//
// ANSI escape sequence encoding.
//
// Stateless functions that write one terminal command each to any
// `impl Write`. Deciding *when* to emit is the `CellWriter`'s job; this
// module only knows the bytes.
//
// Coordinates are 0-indexed in the API and converted to the terminal's
// 1-indexed CUP form on output. Errors from the writer propagate; writing
// to an `OutputBuffer` (a Vec) never fails.

use std::io::{self, Write};

use crate::cell::Attr;
use crate::color::CellColor;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` (CUP).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Cursor shape (DECSCUSR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Default,
    Block,
    Underline,
    Bar,
}

/// Set the cursor shape. Shapes are the steady (non-blinking) variants.
#[inline]
pub fn set_cursor_shape(w: &mut impl Write, shape: CursorShape) -> io::Result<()> {
    let n: u8 = match shape {
        CursorShape::Default => 0,
        CursorShape::Block => 2,
        CursorShape::Underline => 4,
        CursorShape::Bar => 6,
    };
    write!(w, "\x1b[{n} q")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes (SGR 0).
///
/// The stateful writer must forget its tracked colors after this.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Set the window title (OSC 2).
pub fn set_title(w: &mut impl Write, title: &str) -> io::Result<()> {
    w.write_all(b"\x1b]2;")?;
    for ch in title.chars().filter(|c| !c.is_control()) {
        let mut enc = [0u8; 4];
        w.write_all(ch.encode_utf8(&mut enc).as_bytes())?;
    }
    w.write_all(b"\x1b\\")
}

// ─── Colors ──────────────────────────────────────────────────────────────────

/// Set the foreground color.
///
/// Compact SGR codes for the 16 standard colors (30–37, 90–97), the
/// 256-color form for palette indices 16–255, 24-bit for RGB.
pub fn fg(w: &mut impl Write, color: CellColor) -> io::Result<()> {
    match color {
        CellColor::Default => w.write_all(b"\x1b[39m"),
        CellColor::Ansi256(idx @ 0..=7) => write!(w, "\x1b[{}m", 30 + u16::from(idx)),
        CellColor::Ansi256(idx @ 8..=15) => write!(w, "\x1b[{}m", 82 + u16::from(idx)),
        CellColor::Ansi256(idx) => write!(w, "\x1b[38;5;{idx}m"),
        CellColor::Rgb(r, g, b) => write!(w, "\x1b[38;2;{r};{g};{b}m"),
    }
}

/// Set the background color. Same scheme as [`fg`] with BG codes.
pub fn bg(w: &mut impl Write, color: CellColor) -> io::Result<()> {
    match color {
        CellColor::Default => w.write_all(b"\x1b[49m"),
        CellColor::Ansi256(idx @ 0..=7) => write!(w, "\x1b[{}m", 40 + u16::from(idx)),
        CellColor::Ansi256(idx @ 8..=15) => write!(w, "\x1b[{}m", 92 + u16::from(idx)),
        CellColor::Ansi256(idx) => write!(w, "\x1b[48;5;{idx}m"),
        CellColor::Rgb(r, g, b) => write!(w, "\x1b[48;2;{r};{g};{b}m"),
    }
}

// ─── Text Attributes ─────────────────────────────────────────────────────────

const ATTR_CODES: [(Attr, &[u8]); 8] = [
    (Attr::BOLD, b"1"),
    (Attr::DIM, b"2"),
    (Attr::ITALIC, b"3"),
    (Attr::UNDERLINE, b"4"),
    (Attr::BLINK, b"5"),
    (Attr::INVERSE, b"7"),
    (Attr::HIDDEN, b"8"),
    (Attr::STRIKETHROUGH, b"9"),
];

/// Emit all set attributes as one SGR sequence, e.g. `\x1b[1;3;9m`.
///
/// Writes nothing when `attr` is empty.
pub fn attrs(w: &mut impl Write, attr: Attr) -> io::Result<()> {
    if attr.is_empty() {
        return Ok(());
    }
    w.write_all(b"\x1b[")?;
    let mut first = true;
    for (flag, code) in ATTR_CODES {
        if attr.contains(flag) {
            if !first {
                w.write_all(b";")?;
            }
            w.write_all(code)?;
            first = false;
        }
    }
    w.write_all(b"m")
}

// ─── Hyperlinks ──────────────────────────────────────────────────────────────

/// Open an OSC 8 hyperlink. Text written until [`hyperlink_close`] links
/// to `url`.
pub fn hyperlink_open(w: &mut impl Write, url: &str, id: Option<&str>) -> io::Result<()> {
    w.write_all(b"\x1b]8;")?;
    if let Some(id) = id {
        write!(w, "id={id}")?;
    }
    write!(w, ";{url}\x1b\\")
}

/// Close the current OSC 8 hyperlink.
#[inline]
pub fn hyperlink_close(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b]8;;\x1b\\")
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC 2026). The terminal holds the frame
/// until [`end_sync`].
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ────────────────────────────────────────────────────────

#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Mouse ───────────────────────────────────────────────────────────────────

/// Mouse tracking granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    /// Press and release (DEC 1000).
    Click,
    /// Plus drag motion (DEC 1002).
    Drag,
    /// Plus all motion (DEC 1003).
    Motion,
}

/// Enable SGR-encoded mouse tracking (DEC 1006) at the given granularity.
pub fn enable_mouse(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h")?;
    if matches!(mode, MouseMode::Drag | MouseMode::Motion) {
        w.write_all(b"\x1b[?1002h")?;
    }
    if mode == MouseMode::Motion {
        w.write_all(b"\x1b[?1003h")?;
    }
    w.write_all(b"\x1b[?1006h")
}

pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l")
}

// ─── Bracketed Paste & Focus Reporting ───────────────────────────────────────

/// Enable bracketed paste (DEC 2004): pastes arrive between
/// `\x1b[200~` and `\x1b[201~`.
#[inline]
pub fn enable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004h")
}

#[inline]
pub fn disable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004l")
}

/// Enable focus reporting (DEC 1004): `\x1b[I` / `\x1b[O`.
#[inline]
pub fn enable_focus_reporting(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1004h")
}

#[inline]
pub fn disable_focus_reporting(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1004l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
