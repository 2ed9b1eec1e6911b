// SPDX-License-Identifier: MIT
//
// Colors as the terminal sees them.
//
// Two types cover every color that reaches a cell:
//
//   Rgb: a plain 24-bit triple. This is what node styles carry. A style
//   field is `Option<Rgb>`, so "unset" (inherit the terminal default) and
//   "set to black" stay distinct.
//
//   CellColor: the resolved per-cell color: TrueColor, a 256-palette
//   index, or the terminal default. The diff renderer compares these and
//   the ANSI encoder turns them into SGR parameters.

use std::fmt;

// ─── Rgb ─────────────────────────────────────────────────────────────────────

/// A 24-bit sRGB color.
///
/// # Examples
///
/// ```
/// use weft_term::color::Rgb;
///
/// let c = Rgb::from_hex("#ff8000").unwrap();
/// assert_eq!(c, Rgb::new(255, 128, 0));
/// assert_eq!(c.to_string(), "#ff8000");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb`.
    ///
    /// Returns `None` for anything else.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            6 => {
                let v = u32::from_str_radix(hex, 16).ok()?;
                let [_, r, g, b] = v.to_be_bytes();
                Some(Self::new(r, g, b))
            }
            3 => {
                let mut out = [0u8; 3];
                for (slot, ch) in out.iter_mut().zip(hex.chars()) {
                    // Hex digit, so the value fits in a nibble.
                    #[allow(clippy::cast_possible_truncation)]
                    let n = ch.to_digit(16)? as u8;
                    *slot = n << 4 | n;
                }
                Some(Self::new(out[0], out[1], out[2]))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// ─── CellColor ───────────────────────────────────────────────────────────────

/// A fully resolved terminal color stored in a cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellColor {
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),

    /// ANSI 256-color palette index.
    Ansi256(u8),

    /// Terminal default color (whatever the user's theme says).
    #[default]
    Default,
}

impl CellColor {
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }
}

impl From<Rgb> for CellColor {
    #[inline]
    fn from(c: Rgb) -> Self {
        Self::Rgb(c.r, c.g, c.b)
    }
}

impl From<Option<Rgb>> for CellColor {
    /// An unset style color maps to the terminal default.
    #[inline]
    fn from(c: Option<Rgb>) -> Self {
        c.map_or(Self::Default, Self::from)
    }
}

impl fmt::Debug for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "Rgb({r}, {g}, {b})"),
            Self::Ansi256(idx) => write!(f, "Ansi256({idx})"),
            Self::Default => write!(f, "Default"),
        }
    }
}

impl fmt::Display for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Ansi256(idx) => write!(f, "ansi({idx})"),
            Self::Default => write!(f, "default"),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
