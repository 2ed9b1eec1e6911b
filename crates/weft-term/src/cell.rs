// SPDX-License-Identifier: MIT
//
// Cell: one character position on screen.
//
// A cell holds one grapheme cluster (not one codepoint: "e" + combining
// acute, a flag, or a ZWJ family all live in a single cell), resolved
// foreground and background colors, SGR attributes, and an optional
// hyperlink slot.
//
// Graphemes are stored inline in a fixed 15-byte array so `Cell` stays
// `Copy` and frame comparison is a plain memcmp-style slice equality.
// Clusters longer than that (rare, e.g. long ZWJ chains) degrade to their
// first codepoint.
//
// Wide clusters (CJK, emoji) span two columns. The first cell holds the
// grapheme; the second is a continuation cell (empty grapheme). The
// renderer skips continuation output but still applies its colors.

use std::fmt;

use crate::color::CellColor;

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// SGR text attributes stored as a compact bitfield.
    ///
    /// ```
    /// use weft_term::cell::Attr;
    ///
    /// let style = Attr::BOLD | Attr::UNDERLINE;
    /// assert!(style.contains(Attr::BOLD));
    /// assert!(!style.contains(Attr::ITALIC));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1.
        const BOLD          = 1 << 0;
        /// SGR 2.
        const DIM           = 1 << 1;
        /// SGR 3.
        const ITALIC        = 1 << 2;
        /// SGR 4.
        const UNDERLINE     = 1 << 3;
        /// SGR 5.
        const BLINK         = 1 << 4;
        /// SGR 7, swaps foreground and background.
        const INVERSE       = 1 << 5;
        /// SGR 8.
        const HIDDEN        = 1 << 6;
        /// SGR 9.
        const STRIKETHROUGH = 1 << 7;
    }
}

// ─── Grapheme ────────────────────────────────────────────────────────────────

/// Inline capacity of a [`Grapheme`], in UTF-8 bytes.
pub const GRAPHEME_CAP: usize = 15;

/// A grapheme cluster stored inline.
///
/// Always valid UTF-8. An empty grapheme marks a continuation cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grapheme {
    bytes: [u8; GRAPHEME_CAP],
    len: u8,
}

impl Grapheme {
    /// The continuation marker.
    pub const EMPTY: Self = Self {
        bytes: [0; GRAPHEME_CAP],
        len: 0,
    };

    /// A single space.
    pub const SPACE: Self = Self::ascii(b' ');

    /// A one-byte ASCII grapheme.
    #[must_use]
    pub const fn ascii(b: u8) -> Self {
        let mut bytes = [0; GRAPHEME_CAP];
        bytes[0] = b & 0x7F;
        Self { bytes, len: 1 }
    }

    /// Store `s`, or its first codepoint when the cluster does not fit.
    #[must_use]
    pub fn new(s: &str) -> Self {
        let src = if s.len() <= GRAPHEME_CAP {
            s
        } else {
            s.chars().next().map_or("", |c| &s[..c.len_utf8()])
        };
        let mut bytes = [0; GRAPHEME_CAP];
        bytes[..src.len()].copy_from_slice(src.as_bytes());
        // src.len() <= GRAPHEME_CAP (15) here.
        #[allow(clippy::cast_possible_truncation)]
        let len = src.len() as u8;
        Self { bytes, len }
    }

    #[must_use]
    pub fn from_char(ch: char) -> Self {
        let mut bytes = [0; GRAPHEME_CAP];
        let n = ch.encode_utf8(&mut bytes).len();
        // A char is at most 4 bytes.
        #[allow(clippy::cast_possible_truncation)]
        let len = n as u8;
        Self { bytes, len }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..usize::from(self.len)]).unwrap_or("?")
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }
}

impl fmt::Debug for Grapheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl From<char> for Grapheme {
    fn from(ch: char) -> Self {
        Self::from_char(ch)
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single terminal cell.
///
/// `link` is an index into the owning frame buffer's hyperlink table;
/// `0` means no hyperlink.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub grapheme: Grapheme,
    pub fg: CellColor,
    pub bg: CellColor,
    pub attrs: Attr,
    pub link: u16,
}

impl Cell {
    /// Space, default colors, no attributes.
    pub const EMPTY: Self = Self {
        grapheme: Grapheme::SPACE,
        fg: CellColor::Default,
        bg: CellColor::Default,
        attrs: Attr::empty(),
        link: 0,
    };

    /// A cell with a character and default styling.
    #[must_use]
    pub fn new(ch: char) -> Self {
        Self {
            grapheme: Grapheme::from_char(ch),
            ..Self::EMPTY
        }
    }

    /// A cell with a grapheme cluster and full styling.
    #[must_use]
    pub fn styled(grapheme: &str, fg: CellColor, bg: CellColor, attrs: Attr) -> Self {
        Self {
            grapheme: Grapheme::new(grapheme),
            fg,
            bg,
            attrs,
            link: 0,
        }
    }

    /// The second column of a wide cluster. Inherits colors so the
    /// background fills correctly.
    #[inline]
    #[must_use]
    pub const fn continuation(fg: CellColor, bg: CellColor, attrs: Attr) -> Self {
        Self {
            grapheme: Grapheme::EMPTY,
            fg,
            bg,
            attrs,
            link: 0,
        }
    }

    // ─── Queries ──────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        self.grapheme.is_empty()
    }

    /// Space, default colors, no attributes, no link.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// The grapheme text. Empty for continuation cells.
    #[inline]
    #[must_use]
    pub fn symbol(&self) -> &str {
        self.grapheme.as_str()
    }

    /// Same colors, attributes and link, ignoring the grapheme.
    #[inline]
    #[must_use]
    pub fn same_style(&self, other: &Self) -> bool {
        self.fg == other.fg
            && self.bg == other.bg
            && self.attrs == other.attrs
            && self.link == other.link
    }

    // ─── Builders ─────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn with_fg(self, fg: CellColor) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_bg(self, bg: CellColor) -> Self {
        Self { bg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_link(self, link: u16) -> Self {
        Self { link, ..self }
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        write!(f, "Cell({:?}", self.symbol())?;
        if !self.fg.is_default() {
            write!(f, ", fg={:?}", self.fg)?;
        }
        if !self.bg.is_default() {
            write!(f, ", bg={:?}", self.bg)?;
        }
        if !self.attrs.is_empty() {
            write!(f, ", {:?}", self.attrs)?;
        }
        if self.link != 0 {
            write!(f, ", link={}", self.link)?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
