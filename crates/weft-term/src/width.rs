// SPDX-License-Identifier: MIT
//
// Display width of text in terminal columns.
//
// Everything that measures or places text goes through here: the frame
// buffer when it writes a string cell by cell, the wrap/truncate service
// when it decides where a line ends, and the layout engine's measure
// callback for text leaves.
//
// Width rules:
//
//   - Control characters are 0 columns. They never reach a cell.
//   - Single codepoints use the East Asian Width tables from
//     `unicode-width` (CJK and fullwidth forms are 2).
//   - A grapheme cluster that is an emoji sequence is 2 columns:
//     anything joined with ZWJ, forced to emoji presentation with VS16,
//     carrying a skin-tone modifier, a keycap, or a regional-indicator
//     pair (flags).
//   - Any other cluster takes the width of its base character, so
//     combining marks add nothing.
//
// Segmentation follows UAX #29 extended grapheme clusters via
// `unicode-segmentation`.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

const ZWJ: u32 = 0x200D;
const VS16: u32 = 0xFE0F;
const KEYCAP: u32 = 0x20E3;

/// Display width of a single codepoint.
///
/// # Examples
///
/// ```
/// use weft_term::width::char_width;
///
/// assert_eq!(char_width('a'), 1);
/// assert_eq!(char_width('中'), 2);
/// assert_eq!(char_width('\n'), 0);
/// assert_eq!(char_width('\u{0301}'), 0);
/// ```
#[inline]
#[must_use]
pub fn char_width(ch: char) -> usize {
    if ch.is_control() {
        return 0;
    }
    ch.width().unwrap_or(0)
}

/// Whether `cp` is one of the 26 regional indicator symbols.
#[inline]
const fn is_regional_indicator(cp: u32) -> bool {
    matches!(cp, 0x1F1E6..=0x1F1FF)
}

/// Whether `cp` is a Fitzpatrick skin-tone modifier.
#[inline]
const fn is_skin_tone(cp: u32) -> bool {
    matches!(cp, 0x1F3FB..=0x1F3FF)
}

/// Display width of one grapheme cluster.
///
/// # Examples
///
/// ```
/// use weft_term::width::grapheme_width;
///
/// assert_eq!(grapheme_width("e\u{0301}"), 1);
/// assert_eq!(grapheme_width("🇯🇵"), 2);
/// assert_eq!(grapheme_width("👍🏽"), 2);
/// ```
#[must_use]
pub fn grapheme_width(grapheme: &str) -> usize {
    let mut chars = grapheme.chars();
    let Some(first) = chars.next() else {
        return 0;
    };

    if grapheme.len() == first.len_utf8() {
        return char_width(first);
    }

    if is_regional_indicator(first as u32) {
        return 2;
    }

    for ch in chars {
        let cp = ch as u32;
        if cp == ZWJ || cp == VS16 || cp == KEYCAP || is_skin_tone(cp) {
            return 2;
        }
    }

    char_width(first)
}

/// Display width of a string: the sum of its grapheme widths.
///
/// # Examples
///
/// ```
/// use weft_term::width::string_width;
///
/// assert_eq!(string_width("hello"), 5);
/// assert_eq!(string_width("a中b"), 4);
/// assert_eq!(string_width(""), 0);
/// ```
#[must_use]
pub fn string_width(s: &str) -> usize {
    if s.is_ascii() {
        return s.bytes().filter(|b| !b.is_ascii_control()).count();
    }
    s.graphemes(true).map(grapheme_width).sum()
}

/// Iterate the extended grapheme clusters of `s`.
#[inline]
pub fn graphemes(s: &str) -> impl Iterator<Item = &str> {
    s.graphemes(true)
}

/// Iterate grapheme clusters paired with their display width.
#[inline]
pub fn graphemes_with_width(s: &str) -> impl Iterator<Item = (&str, usize)> {
    s.graphemes(true).map(|g| (g, grapheme_width(g)))
}

/// Byte offset of the longest prefix of `s` that fits in `max_cols`.
///
/// Never splits a grapheme cluster. Returns `(byte_len, width)`.
#[must_use]
pub fn prefix_fitting(s: &str, max_cols: usize) -> (usize, usize) {
    let mut bytes = 0;
    let mut cols = 0;
    for (g, w) in graphemes_with_width(s) {
        if cols + w > max_cols {
            break;
        }
        cols += w;
        bytes += g.len();
    }
    (bytes, cols)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── char_width ──────────────────────────────────────────────────────

    #[test]
    fn ascii_is_one_column() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width(' '), 1);
        assert_eq!(char_width('~'), 1);
    }

    #[test]
    fn controls_are_zero() {
        for ch in ['\0', '\t', '\n', '\r', '\x1b', '\x7f'] {
            assert_eq!(char_width(ch), 0, "{ch:?}");
        }
    }

    #[test]
    fn cjk_and_fullwidth_are_two() {
        assert_eq!(char_width('你'), 2);
        assert_eq!(char_width('한'), 2);
        assert_eq!(char_width('Ａ'), 2);
    }

    #[test]
    fn combining_marks_are_zero() {
        assert_eq!(char_width('\u{0300}'), 0);
        assert_eq!(char_width('\u{0301}'), 0);
    }

    // ── grapheme_width ──────────────────────────────────────────────────

    #[test]
    fn empty_grapheme() {
        assert_eq!(grapheme_width(""), 0);
    }

    #[test]
    fn base_plus_combining_takes_base_width() {
        assert_eq!(grapheme_width("e\u{0301}"), 1);
        assert_eq!(grapheme_width("a\u{030A}"), 1);
    }

    #[test]
    fn zwj_family_is_two() {
        assert_eq!(grapheme_width("👨\u{200D}👩\u{200D}👧"), 2);
    }

    #[test]
    fn vs16_forces_two() {
        assert_eq!(grapheme_width("\u{2764}\u{FE0F}"), 2);
    }

    #[test]
    fn keycap_is_two() {
        assert_eq!(grapheme_width("1\u{FE0F}\u{20E3}"), 2);
    }

    #[test]
    fn flag_is_two() {
        assert_eq!(grapheme_width("🇺🇸"), 2);
    }

    // ── string_width ────────────────────────────────────────────────────

    #[test]
    fn string_width_mixed() {
        assert_eq!(string_width("a中b"), 4);
        assert_eq!(string_width("caf\u{e9}"), 4);
        assert_eq!(string_width("cafe\u{301}"), 4);
    }

    #[test]
    fn string_width_ignores_ascii_controls() {
        assert_eq!(string_width("a\tb\n"), 2);
    }

    #[test]
    fn graphemes_keep_clusters_together() {
        let parts: Vec<&str> = graphemes("ae\u{301}🇺🇸").collect();
        assert_eq!(parts, vec!["a", "e\u{301}", "🇺🇸"]);
    }

    // ── prefix_fitting ──────────────────────────────────────────────────

    #[test]
    fn prefix_fitting_stops_before_wide_overflow() {
        assert_eq!(prefix_fitting("ab中", 3), (2, 2));
        assert_eq!(prefix_fitting("ab中", 4), (5, 4));
    }

    #[test]
    fn prefix_fitting_zero_width() {
        assert_eq!(prefix_fitting("hello", 0), (0, 0));
    }
}
