//! Text wrapping, truncation and measurement in terminal columns.
//!
//! Widths come from [`weft_term::width`], so wide CJK, emoji sequences and
//! combining marks are measured the same way the frame buffer paints them.
//! Hard line breaks (`\n`) are always honored.

use weft_term::width::{graphemes_with_width, prefix_fitting, string_width};

use crate::style::WrapMode;

/// Break `text` into lines no wider than `width` columns.
///
/// Empty text yields no lines. A line that already fits is kept verbatim;
/// a line that must break loses the spaces at its break points. With
/// [`WrapMode::Word`] a single word wider than `width` overflows its line,
/// [`WrapMode::WordOrChar`] splits it instead.
///
/// ```
/// use weft_ui::style::WrapMode;
/// use weft_ui::text::wrap_text;
///
/// assert_eq!(wrap_text("hello world", 5, WrapMode::Word), ["hello", "world"]);
/// ```
#[must_use]
pub fn wrap_text(text: &str, width: usize, mode: WrapMode) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let width = width.max(1);
    let mut lines = Vec::new();
    for line in text.split('\n') {
        if string_width(line) <= width {
            lines.push(line.to_owned());
            continue;
        }
        match mode {
            WrapMode::None => lines.push(line.to_owned()),
            WrapMode::Char => wrap_chars(line, width, &mut lines),
            WrapMode::Word => wrap_words(line, width, false, &mut lines),
            WrapMode::WordOrChar => wrap_words(line, width, true, &mut lines),
        }
    }
    lines
}

fn wrap_chars(line: &str, width: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut cols = 0;
    for (g, w) in graphemes_with_width(line) {
        if cols + w > width && !current.is_empty() {
            out.push(std::mem::take(&mut current));
            cols = 0;
        }
        current.push_str(g);
        cols += w;
    }
    if !current.is_empty() {
        out.push(current);
    }
}

fn wrap_words(line: &str, width: usize, split_long: bool, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut cols = 0;

    for word in line.split(' ').filter(|w| !w.is_empty()) {
        let word_cols = string_width(word);

        if cols > 0 && cols + 1 + word_cols <= width {
            current.push(' ');
            current.push_str(word);
            cols += 1 + word_cols;
            continue;
        }
        if cols > 0 {
            out.push(std::mem::take(&mut current));
            cols = 0;
        }

        if word_cols <= width || !split_long {
            current.push_str(word);
            cols = word_cols;
            continue;
        }

        let mut rest = word;
        while !rest.is_empty() {
            let (mut bytes, mut used) = prefix_fitting(rest, width);
            if bytes == 0 {
                // A cluster wider than the line goes on a line of its own.
                let (g, w) = graphemes_with_width(rest).next().unwrap_or((rest, 0));
                bytes = g.len();
                used = w;
            }
            let (head, tail) = rest.split_at(bytes);
            if tail.is_empty() {
                current.push_str(head);
                cols = used;
            } else {
                out.push(head.to_owned());
            }
            rest = tail;
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
}

/// Shorten `text` to at most `width` columns, ending in `ellipsis` when
/// anything was cut. Never splits a grapheme cluster.
///
/// ```
/// use weft_ui::text::truncate;
///
/// assert_eq!(truncate("hello world", 8, "…"), "hello w…");
/// assert_eq!(truncate("short", 8, "…"), "short");
/// ```
#[must_use]
pub fn truncate(text: &str, width: usize, ellipsis: &str) -> String {
    if string_width(text) <= width {
        return text.to_owned();
    }
    let ellipsis_cols = string_width(ellipsis);
    if width <= ellipsis_cols {
        let (bytes, _) = prefix_fitting(ellipsis, width);
        return ellipsis[..bytes].to_owned();
    }
    let (bytes, _) = prefix_fitting(text, width - ellipsis_cols);
    let mut out = String::with_capacity(bytes + ellipsis.len());
    out.push_str(&text[..bytes]);
    out.push_str(ellipsis);
    out
}

/// Size of `text` in `(columns, rows)` once wrapped to `width`.
///
/// `None` means unbounded: only hard breaks split lines.
#[must_use]
pub fn measure(text: &str, width: Option<usize>, mode: WrapMode) -> (usize, usize) {
    let lines = match width {
        Some(w) => wrap_text(text, w, mode),
        None => wrap_text(text, usize::MAX, WrapMode::None),
    };
    let cols = lines.iter().map(|l| string_width(l)).max().unwrap_or(0);
    (cols, lines.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
