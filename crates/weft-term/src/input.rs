// SPDX-License-Identifier: MIT
//
// Terminal input decoding.
//
// Each chunk the stdin reader delivers is decoded into one event, or two
// when a bracketed paste ends mid-chunk.
// Entry points:
//
//   parse(bytes)        one chunk to one KeyEvent. Total: every byte
//                       sequence produces a key; only empty input is an
//                       error.
//   parse_mouse(bytes)  one SGR mouse report (`ESC [ < b ; x ; y M|m`).
//                       Anything malformed or truncated is `None`.
//   decode(bytes)       dispatch a chunk to mouse, paste, focus or key.
//   Decoder::feed       the same, carrying bracketed-paste state across
//                       chunks. A paste is capped; bytes after its end
//                       delimiter are decoded too.
//
// Key recognition order in `parse`:
//
//   1. One byte: Enter (CR/LF), Backspace (DEL/BS), Tab, Escape, Ctrl+A..Z,
//      otherwise the byte itself.
//   2. ESC-prefixed: a two-byte chunk is Meta + the second byte. Longer
//      chunks are CSI (`ESC [`) or SS3 (`ESC O`) sequences: arrows,
//      Home/End, Insert/Delete/PageUp/PageDown, Shift+Tab, F1–F12, and the
//      xterm `1 ; m X` modifier form with m in 2..=8.
//   3. A non-ASCII lead byte: the first UTF-8 sequence, strictly validated
//      (no overlongs, no surrogates, nothing past U+10FFFF).
//   4. Anything else: up to KEY_TEXT_CAP raw bytes, truncated, as opaque
//      key text.
//
// The decoder never reads past the slice it was given. Numeric parameters
// are accumulated with saturation (mouse) or a hard cap (key codes), so
// long digit runs cannot overflow.

use std::collections::VecDeque;

use bitflags::bitflags;
use thiserror::Error;
use tracing::warn;

const ESC: u8 = 0x1b;

/// Bytes kept in a [`KeyText`].
pub const KEY_TEXT_CAP: usize = 16;

/// Numeric CSI parameters above this are not key codes.
const MAX_KEY_PARAM: u16 = 999;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no input bytes to decode")]
    Empty,
}

// ─── Key Types ───────────────────────────────────────────────────────────────

bitflags! {
    /// Modifier keys. Bit values match the xterm `1 + mask` encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        /// Alt / Option. Terminals report it as Meta.
        const META  = 1 << 1;
        const CTRL  = 1 << 2;
    }
}

bitflags! {
    /// Non-character keys recognized by the decoder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct SpecialKeys: u16 {
        const UP        = 1 << 0;
        const DOWN      = 1 << 1;
        const LEFT      = 1 << 2;
        const RIGHT     = 1 << 3;
        const HOME      = 1 << 4;
        const END       = 1 << 5;
        const PAGE_UP   = 1 << 6;
        const PAGE_DOWN = 1 << 7;
        const INSERT    = 1 << 8;
        const DELETE    = 1 << 9;
        const BACKSPACE = 1 << 10;
        const TAB       = 1 << 11;
        const ENTER     = 1 << 12;
        const ESCAPE    = 1 << 13;
    }
}

/// Up to [`KEY_TEXT_CAP`] bytes of key text.
///
/// Usually a single UTF-8 character. For unrecognized input it holds the
/// raw bytes, which need not be valid UTF-8.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct KeyText {
    bytes: [u8; KEY_TEXT_CAP],
    len: u8,
}

impl KeyText {
    /// Copy `bytes`, truncating to [`KEY_TEXT_CAP`].
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let n = bytes.len().min(KEY_TEXT_CAP);
        let mut out = [0; KEY_TEXT_CAP];
        out[..n].copy_from_slice(&bytes[..n]);
        // n <= KEY_TEXT_CAP (16).
        #[allow(clippy::cast_possible_truncation)]
        let len = n as u8;
        Self { bytes: out, len }
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// The text, when it is valid UTF-8.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
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

impl std::fmt::Debug for KeyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "{s:?}"),
            None => write!(f, "{:02x?}", self.as_bytes()),
        }
    }
}

/// One decoded key press.
///
/// `text` holds the character (or raw bytes) for printable input and
/// Ctrl/Meta combinations; it is empty for named keys. `function` is 1–12
/// for F-keys and 0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct KeyEvent {
    pub text: KeyText,
    pub special: SpecialKeys,
    pub modifiers: Modifiers,
    pub function: u8,
}

impl KeyEvent {
    #[must_use]
    pub fn text(text: &[u8]) -> Self {
        Self {
            text: KeyText::from_bytes(text),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn special(special: SpecialKeys) -> Self {
        Self {
            special,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn function_key(n: u8) -> Self {
        Self {
            function: n,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = self.modifiers.union(modifiers);
        self
    }

    /// The single character typed, if the key text is exactly one char.
    #[must_use]
    pub fn char(&self) -> Option<char> {
        let s = self.text.as_str()?;
        let mut it = s.chars();
        let ch = it.next()?;
        it.next().is_none().then_some(ch)
    }

    #[inline]
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    #[inline]
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn meta(&self) -> bool {
        self.modifiers.contains(Modifiers::META)
    }

    #[inline]
    #[must_use]
    pub const fn up_arrow(&self) -> bool {
        self.special.contains(SpecialKeys::UP)
    }

    #[inline]
    #[must_use]
    pub const fn down_arrow(&self) -> bool {
        self.special.contains(SpecialKeys::DOWN)
    }

    #[inline]
    #[must_use]
    pub const fn left_arrow(&self) -> bool {
        self.special.contains(SpecialKeys::LEFT)
    }

    #[inline]
    #[must_use]
    pub const fn right_arrow(&self) -> bool {
        self.special.contains(SpecialKeys::RIGHT)
    }

    #[inline]
    #[must_use]
    pub const fn enter(&self) -> bool {
        self.special.contains(SpecialKeys::ENTER)
    }

    #[inline]
    #[must_use]
    pub const fn escape(&self) -> bool {
        self.special.contains(SpecialKeys::ESCAPE)
    }

    #[inline]
    #[must_use]
    pub const fn tab(&self) -> bool {
        self.special.contains(SpecialKeys::TAB)
    }

    #[inline]
    #[must_use]
    pub const fn backspace(&self) -> bool {
        self.special.contains(SpecialKeys::BACKSPACE)
    }

    /// Ctrl + the given lowercase ASCII letter.
    #[must_use]
    pub fn is_ctrl(&self, letter: char) -> bool {
        self.ctrl() && self.char() == Some(letter)
    }
}

// ─── Mouse Types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
    WheelLeft,
    WheelRight,
    /// Motion or release with no button identified.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseKind {
    Press,
    Release,
    Drag,
    Move,
    Scroll,
}

/// One SGR mouse report. Coordinates are 0-based cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub button: MouseButton,
    pub kind: MouseKind,
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Everything one input chunk can turn into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Bracketed paste contents, lossily decoded.
    Paste(String),
    FocusGained,
    FocusLost,
}

// ─── Key Parsing ─────────────────────────────────────────────────────────────

/// Decode one input chunk as a key press.
///
/// # Errors
///
/// Returns [`DecodeError::Empty`] for an empty slice. Every non-empty
/// input decodes to some key.
///
/// # Examples
///
/// ```
/// use weft_term::input::parse;
///
/// let key = parse(b"\x1b[1;5C").unwrap();
/// assert!(key.ctrl() && key.right_arrow());
///
/// let key = parse("é".as_bytes()).unwrap();
/// assert_eq!(key.char(), Some('é'));
/// ```
pub fn parse(bytes: &[u8]) -> Result<KeyEvent, DecodeError> {
    let Some(&first) = bytes.first() else {
        return Err(DecodeError::Empty);
    };

    if bytes.len() == 1 {
        return Ok(parse_single(first));
    }

    let recognized = if first == ESC {
        parse_escape(bytes)
    } else if first >= 0x80 {
        utf8_sequence_len(bytes).map(|n| KeyEvent::text(&bytes[..n]))
    } else {
        None
    };

    Ok(recognized.unwrap_or_else(|| KeyEvent::text(bytes)))
}

fn parse_single(b: u8) -> KeyEvent {
    match b {
        b'\r' | b'\n' => KeyEvent::special(SpecialKeys::ENTER),
        0x7f | 0x08 => KeyEvent::special(SpecialKeys::BACKSPACE),
        b'\t' => KeyEvent::special(SpecialKeys::TAB),
        ESC => KeyEvent::special(SpecialKeys::ESCAPE),
        1..=26 => KeyEvent::text(&[b'a' + (b - 1)]).with_modifiers(Modifiers::CTRL),
        _ => KeyEvent::text(&[b]),
    }
}

/// `bytes[0]` is ESC and `bytes.len() >= 2`.
fn parse_escape(bytes: &[u8]) -> Option<KeyEvent> {
    if bytes.len() == 2 {
        return Some(KeyEvent::text(&bytes[1..]).with_modifiers(Modifiers::META));
    }
    match bytes[1] {
        b'[' => parse_csi(&bytes[2..]),
        b'O' => parse_ss3(&bytes[2..]),
        _ => {
            // Meta + a multi-byte character.
            let rest = &bytes[1..];
            let n = utf8_sequence_len(rest)?;
            (n == rest.len()).then(|| KeyEvent::text(rest).with_modifiers(Modifiers::META))
        }
    }
}

/// Final letters shared by CSI and SS3: arrows, Home/End, F1–F4.
fn letter_key(b: u8) -> Option<KeyEvent> {
    let key = match b {
        b'A' => KeyEvent::special(SpecialKeys::UP),
        b'B' => KeyEvent::special(SpecialKeys::DOWN),
        b'C' => KeyEvent::special(SpecialKeys::RIGHT),
        b'D' => KeyEvent::special(SpecialKeys::LEFT),
        b'H' => KeyEvent::special(SpecialKeys::HOME),
        b'F' => KeyEvent::special(SpecialKeys::END),
        b'P' => KeyEvent::function_key(1),
        b'Q' => KeyEvent::function_key(2),
        b'R' => KeyEvent::function_key(3),
        b'S' => KeyEvent::function_key(4),
        _ => return None,
    };
    Some(key)
}

/// `ESC O <letter>`.
fn parse_ss3(body: &[u8]) -> Option<KeyEvent> {
    letter_key(*body.first()?)
}

/// The key behind `ESC [ <n> ~`.
fn tilde_key(n: u16) -> Option<KeyEvent> {
    let key = match n {
        1 | 7 => KeyEvent::special(SpecialKeys::HOME),
        2 => KeyEvent::special(SpecialKeys::INSERT),
        3 => KeyEvent::special(SpecialKeys::DELETE),
        4 | 8 => KeyEvent::special(SpecialKeys::END),
        5 => KeyEvent::special(SpecialKeys::PAGE_UP),
        6 => KeyEvent::special(SpecialKeys::PAGE_DOWN),
        11..=14 => KeyEvent::function_key(fkey_index(n - 10)),
        15 => KeyEvent::function_key(5),
        17..=21 => KeyEvent::function_key(fkey_index(n - 11)),
        23 | 24 => KeyEvent::function_key(fkey_index(n - 12)),
        _ => return None,
    };
    Some(key)
}

/// Narrow a function-key number that is known to be 1–12.
#[allow(clippy::cast_possible_truncation)]
const fn fkey_index(n: u16) -> u8 {
    n as u8
}

/// xterm modifier parameter: `1 + mask`, valid for 2..=8.
fn decode_modifiers(param: u16) -> Option<Modifiers> {
    if !(2..=8).contains(&param) {
        return None;
    }
    // param - 1 is 1..=7.
    #[allow(clippy::cast_possible_truncation)]
    let mask = (param - 1) as u8;
    Some(Modifiers::from_bits_truncate(mask))
}

/// Body of a CSI sequence (after `ESC [`).
fn parse_csi(body: &[u8]) -> Option<KeyEvent> {
    let &first = body.first()?;
    if first == b'Z' {
        return Some(KeyEvent::special(SpecialKeys::TAB).with_modifiers(Modifiers::SHIFT));
    }
    if let Some(key) = letter_key(first).filter(|k| k.function == 0) {
        return Some(key);
    }

    let (n, rest) = parse_key_param(body)?;
    match rest.first()? {
        b'~' => tilde_key(n),
        b';' => {
            let (m, rest) = parse_key_param(&rest[1..])?;
            let mods = decode_modifiers(m)?;
            let &fin = rest.first()?;
            let key = if fin == b'~' {
                tilde_key(n)?
            } else if n == 1 {
                letter_key(fin)?
            } else {
                return None;
            };
            Some(key.with_modifiers(mods))
        }
        _ => None,
    }
}

/// Parse leading decimal digits, rejecting empty runs and values past
/// [`MAX_KEY_PARAM`]. Stops accumulating once over the cap.
fn parse_key_param(buf: &[u8]) -> Option<(u16, &[u8])> {
    let digits = buf.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let mut val: u16 = 0;
    for &d in &buf[..digits] {
        val = val * 10 + u16::from(d - b'0');
        if val > MAX_KEY_PARAM {
            return None;
        }
    }
    Some((val, &buf[digits..]))
}

/// Length of the strictly valid UTF-8 sequence at the start of `bytes`.
///
/// Rejects stray continuation bytes, overlong forms (C0, C1, E0 80..9F,
/// F0 80..8F), UTF-16 surrogates (ED A0..BF), anything above U+10FFFF
/// (F4 90.., F5..FF) and truncated sequences.
fn utf8_sequence_len(bytes: &[u8]) -> Option<usize> {
    let &lead = bytes.first()?;
    let (len, second) = match lead {
        0x00..=0x7F => return Some(1),
        0xC2..=0xDF => (2, 0x80..=0xBF),
        0xE0 => (3, 0xA0..=0xBF),
        0xE1..=0xEC | 0xEE..=0xEF => (3, 0x80..=0xBF),
        0xED => (3, 0x80..=0x9F),
        0xF0 => (4, 0x90..=0xBF),
        0xF1..=0xF3 => (4, 0x80..=0xBF),
        0xF4 => (4, 0x80..=0x8F),
        _ => return None,
    };
    let seq = bytes.get(..len)?;
    if !second.contains(&seq[1]) {
        return None;
    }
    seq[2..]
        .iter()
        .all(|b| (0x80..=0xBF).contains(b))
        .then_some(len)
}

// ─── Mouse Parsing ───────────────────────────────────────────────────────────

/// Decode an SGR mouse report: `ESC [ < b ; x ; y M` (press/motion) or
/// `... m` (release).
///
/// # Examples
///
/// ```
/// use weft_term::input::{parse_mouse, MouseButton, MouseKind};
///
/// let ev = parse_mouse(b"\x1b[<0;10;5M").unwrap();
/// assert_eq!((ev.button, ev.kind, ev.x, ev.y), (MouseButton::Left, MouseKind::Press, 9, 4));
/// assert!(parse_mouse(b"\x1b[<0;10").is_none());
/// ```
#[must_use]
pub fn parse_mouse(bytes: &[u8]) -> Option<MouseEvent> {
    let body = bytes.strip_prefix(b"\x1b[<")?;
    let (cb, rest) = parse_saturating(body)?;
    let rest = rest.strip_prefix(b";")?;
    let (raw_x, rest) = parse_saturating(rest)?;
    let rest = rest.strip_prefix(b";")?;
    let (raw_y, rest) = parse_saturating(rest)?;
    let release = match rest.first()? {
        b'M' => false,
        b'm' => true,
        _ => return None,
    };

    let mut modifiers = Modifiers::empty();
    if cb & 4 != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if cb & 8 != 0 {
        modifiers |= Modifiers::META;
    }
    if cb & 16 != 0 {
        modifiers |= Modifiers::CTRL;
    }

    let base = cb & 3;
    let (button, kind) = if cb & 64 != 0 {
        let wheel = match base {
            0 => MouseButton::WheelUp,
            1 => MouseButton::WheelDown,
            2 => MouseButton::WheelLeft,
            _ => MouseButton::WheelRight,
        };
        (wheel, MouseKind::Scroll)
    } else {
        let button = match base {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::None,
        };
        let kind = if cb & 32 != 0 {
            if button == MouseButton::None {
                MouseKind::Move
            } else {
                MouseKind::Drag
            }
        } else if release {
            MouseKind::Release
        } else {
            MouseKind::Press
        };
        (button, kind)
    };

    Some(MouseEvent {
        button,
        kind,
        x: raw_x.saturating_sub(1),
        y: raw_y.saturating_sub(1),
        modifiers,
    })
}

/// Leading digits as a saturating `u16`. At least one digit required.
fn parse_saturating(buf: &[u8]) -> Option<(u16, &[u8])> {
    let digits = buf.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let val = buf[..digits].iter().fold(0u16, |acc, d| {
        acc.saturating_mul(10).saturating_add(u16::from(d - b'0'))
    });
    Some((val, &buf[digits..]))
}

// ─── Chunk Decoder ───────────────────────────────────────────────────────────

const PASTE_START: &[u8] = b"\x1b[200~";
const PASTE_END: &[u8] = b"\x1b[201~";

/// Decode one self-contained chunk.
///
/// A bracketed paste must arrive whole; use [`Decoder`] when it may be
/// split across reads. Returns `None` for empty input and malformed mouse
/// reports.
#[must_use]
pub fn decode(chunk: &[u8]) -> Option<InputEvent> {
    if let Some(body) = chunk.strip_prefix(PASTE_START) {
        let end = body
            .windows(PASTE_END.len())
            .position(|w| w == PASTE_END)
            .unwrap_or(body.len());
        return Some(InputEvent::Paste(String::from_utf8_lossy(&body[..end]).into_owned()));
    }

    if chunk.starts_with(b"\x1b[<") {
        return parse_mouse(chunk).map(InputEvent::Mouse);
    }

    match chunk {
        b"\x1b[I" => Some(InputEvent::FocusGained),
        b"\x1b[O" => Some(InputEvent::FocusLost),
        _ => parse(chunk).ok().map(InputEvent::Key),
    }
}

/// Largest bracketed paste buffered before it is delivered unterminated.
pub const DEFAULT_PASTE_CAP: usize = 1 << 20;

/// Turns raw input chunks into [`InputEvent`]s.
///
/// Bracketed paste can span several reads; the decoder buffers until the
/// closing delimiter arrives or the buffer reaches its cap. A chunk can
/// yield more than one event (a paste end followed by a key, say): `feed`
/// returns the first and the rest wait in [`Decoder::take_queued`].
#[derive(Debug)]
pub struct Decoder {
    paste: Option<Vec<u8>>,
    paste_cap: usize,
    queued: VecDeque<InputEvent>,
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_paste_cap(DEFAULT_PASTE_CAP)
    }

    /// A decoder that flushes an open paste once it holds `cap` bytes.
    #[must_use]
    pub fn with_paste_cap(cap: usize) -> Self {
        Self {
            paste: None,
            paste_cap: cap.max(1),
            queued: VecDeque::new(),
        }
    }

    /// Whether a paste is open and waiting for its end delimiter.
    #[must_use]
    pub const fn in_paste(&self) -> bool {
        self.paste.is_some()
    }

    /// Decode one chunk. Returns `None` for empty chunks, malformed mouse
    /// reports, and paste data still awaiting its end delimiter.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<InputEvent> {
        let mut rest = chunk;
        loop {
            let (event, tail) = self.step(rest);
            self.queued.extend(event);
            if tail.is_empty() {
                break;
            }
            rest = tail;
        }
        self.queued.pop_front()
    }

    /// Further events decoded by the last [`feed`](Self::feed), oldest
    /// first.
    pub fn take_queued(&mut self) -> Option<InputEvent> {
        self.queued.pop_front()
    }

    /// Decode from the front of `bytes`, returning what was not consumed.
    fn step<'b>(&mut self, bytes: &'b [u8]) -> (Option<InputEvent>, &'b [u8]) {
        if self.paste.is_some() {
            return self.continue_paste(bytes);
        }
        if let Some(body) = bytes.strip_prefix(PASTE_START) {
            self.paste = Some(Vec::new());
            return self.continue_paste(body);
        }
        (decode(bytes), &[])
    }

    fn continue_paste<'b>(&mut self, bytes: &'b [u8]) -> (Option<InputEvent>, &'b [u8]) {
        let Some(buf) = self.paste.as_mut() else {
            return (None, bytes);
        };
        let old = buf.len();
        // The delimiter may straddle the previous chunk and this one.
        let from = old.saturating_sub(PASTE_END.len() - 1);
        buf.extend_from_slice(bytes);

        if let Some(at) = buf[from..].windows(PASTE_END.len()).position(|w| w == PASTE_END) {
            let end = from + at;
            let consumed = (end + PASTE_END.len()).saturating_sub(old).min(bytes.len());
            buf.truncate(end);
            let text = String::from_utf8_lossy(buf).into_owned();
            self.paste = None;
            return (Some(InputEvent::Paste(text)), &bytes[consumed..]);
        }

        if buf.len() >= self.paste_cap {
            warn!(bytes = buf.len(), cap = self.paste_cap, "paste never terminated, delivering it");
            let text = String::from_utf8_lossy(buf).into_owned();
            self.paste = None;
            return (Some(InputEvent::Paste(text)), &[]);
        }
        (None, &[])
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(bytes: &[u8]) -> KeyEvent {
        parse(bytes).unwrap()
    }

    // ── Single bytes ────────────────────────────────────────────────────

    #[test]
    fn empty_is_error() {
        assert_eq!(parse(b""), Err(DecodeError::Empty));
    }

    #[test]
    fn printable_ascii() {
        let k = key(b"a");
        assert_eq!(k.char(), Some('a'));
        assert!(k.modifiers.is_empty());
        assert!(k.special.is_empty());
    }

    #[test]
    fn enter_backspace_tab_escape() {
        assert!(key(b"\r").enter());
        assert!(key(b"\n").enter());
        assert!(key(b"\x7f").backspace());
        assert!(key(b"\x08").backspace());
        assert!(key(b"\t").tab());
        assert!(key(b"\x1b").escape());
    }

    #[test]
    fn ctrl_letters() {
        assert!(key(b"\x01").is_ctrl('a'));
        assert!(key(b"\x03").is_ctrl('c'));
        assert!(key(b"\x1a").is_ctrl('z'));
    }

    #[test]
    fn nul_is_raw() {
        let k = key(b"\x00");
        assert_eq!(k.text.as_bytes(), b"\x00");
        assert!(!k.ctrl());
    }

    #[test]
    fn lone_high_byte_is_raw() {
        let k = key(&[0xff]);
        assert_eq!(k.text.as_bytes(), &[0xff]);
        assert_eq!(k.text.as_str(), None);
    }

    // ── Meta ────────────────────────────────────────────────────────────

    #[test]
    fn esc_plus_byte_is_meta() {
        let k = key(b"\x1bx");
        assert!(k.meta());
        assert_eq!(k.char(), Some('x'));
    }

    #[test]
    fn esc_bracket_alone_is_meta_bracket() {
        let k = key(b"\x1b[");
        assert!(k.meta());
        assert_eq!(k.char(), Some('['));
    }

    #[test]
    fn meta_multibyte_char() {
        let k = key("\x1bé".as_bytes());
        assert!(k.meta());
        assert_eq!(k.char(), Some('é'));
    }

    // ── CSI / SS3 ───────────────────────────────────────────────────────

    #[test]
    fn arrows_csi_and_ss3() {
        assert!(key(b"\x1b[A").up_arrow());
        assert!(key(b"\x1b[B").down_arrow());
        assert!(key(b"\x1b[C").right_arrow());
        assert!(key(b"\x1b[D").left_arrow());
        assert!(key(b"\x1bOA").up_arrow());
        assert!(key(b"\x1bOD").left_arrow());
    }

    #[test]
    fn home_end_forms() {
        for seq in [&b"\x1b[H"[..], b"\x1bOH", b"\x1b[1~", b"\x1b[7~"] {
            assert!(key(seq).special.contains(SpecialKeys::HOME), "{seq:?}");
        }
        for seq in [&b"\x1b[F"[..], b"\x1bOF", b"\x1b[4~", b"\x1b[8~"] {
            assert!(key(seq).special.contains(SpecialKeys::END), "{seq:?}");
        }
    }

    #[test]
    fn editing_keys() {
        assert_eq!(key(b"\x1b[3~").special, SpecialKeys::DELETE);
        assert_eq!(key(b"\x1b[5~").special, SpecialKeys::PAGE_UP);
        assert_eq!(key(b"\x1b[6~").special, SpecialKeys::PAGE_DOWN);
        assert_eq!(key(b"\x1b[2~").special, SpecialKeys::INSERT);
    }

    #[test]
    fn shift_tab() {
        let k = key(b"\x1b[Z");
        assert!(k.tab());
        assert!(k.shift());
    }

    #[test]
    fn function_keys() {
        let cases: [(&[u8], u8); 12] = [
            (b"\x1bOP", 1),
            (b"\x1bOQ", 2),
            (b"\x1bOR", 3),
            (b"\x1bOS", 4),
            (b"\x1b[15~", 5),
            (b"\x1b[17~", 6),
            (b"\x1b[18~", 7),
            (b"\x1b[19~", 8),
            (b"\x1b[20~", 9),
            (b"\x1b[21~", 10),
            (b"\x1b[23~", 11),
            (b"\x1b[24~", 12),
        ];
        for (seq, n) in cases {
            assert_eq!(key(seq).function, n, "{seq:?}");
        }
    }

    #[test]
    fn rxvt_f1_to_f4() {
        assert_eq!(key(b"\x1b[11~").function, 1);
        assert_eq!(key(b"\x1b[14~").function, 4);
    }

    #[test]
    fn csi_bare_p_is_not_f1() {
        // Only SS3 carries F1–F4 as a bare letter.
        let k = key(b"\x1b[P");
        assert_eq!(k.function, 0);
        assert_eq!(k.text.as_bytes(), b"\x1b[P");
    }

    // ── Modifiers ───────────────────────────────────────────────────────

    #[test]
    fn ctrl_right_arrow() {
        let k = key(b"\x1b[1;5C");
        assert!(k.ctrl());
        assert!(k.right_arrow());
        assert!(!k.shift());
    }

    #[test]
    fn every_modifier_combination() {
        let expect = [
            (2, Modifiers::SHIFT),
            (3, Modifiers::META),
            (4, Modifiers::SHIFT | Modifiers::META),
            (5, Modifiers::CTRL),
            (6, Modifiers::SHIFT | Modifiers::CTRL),
            (7, Modifiers::META | Modifiers::CTRL),
            (8, Modifiers::SHIFT | Modifiers::META | Modifiers::CTRL),
        ];
        for (m, mods) in expect {
            let seq = format!("\x1b[1;{m}A");
            let k = key(seq.as_bytes());
            assert_eq!(k.modifiers, mods, "m={m}");
            assert!(k.up_arrow());
        }
    }

    #[test]
    fn out_of_range_modifier_is_unrecognized() {
        for seq in [&b"\x1b[1;9A"[..], b"\x1b[1;1A", b"\x1b[1;0A"] {
            let k = key(seq);
            assert!(k.special.is_empty(), "{seq:?}");
            assert_eq!(k.text.as_bytes(), seq);
        }
    }

    #[test]
    fn modified_tilde_keys() {
        let k = key(b"\x1b[3;5~");
        assert_eq!(k.special, SpecialKeys::DELETE);
        assert!(k.ctrl());
        let k = key(b"\x1b[15;2~");
        assert_eq!(k.function, 5);
        assert!(k.shift());
    }

    #[test]
    fn modified_ss3_letters_via_csi() {
        let k = key(b"\x1b[1;2P");
        assert_eq!(k.function, 1);
        assert!(k.shift());
    }

    // ── Caps & fallbacks ────────────────────────────────────────────────

    #[test]
    fn huge_tilde_number_is_unrecognized() {
        let k = key(b"\x1b[99999999999999999999~");
        assert_eq!(k.function, 0);
        assert!(k.special.is_empty());
        assert_eq!(k.text.len(), KEY_TEXT_CAP);
    }

    #[test]
    fn unknown_tilde_code_falls_back() {
        let k = key(b"\x1b[16~");
        assert_eq!(k.function, 0);
        assert_eq!(k.text.as_bytes(), b"\x1b[16~");
    }

    #[test]
    fn raw_fallback_truncates() {
        let long = [b'x'; 40];
        let k = key(&long);
        assert_eq!(k.text.len(), KEY_TEXT_CAP);
        assert_eq!(k.text.as_bytes(), &long[..KEY_TEXT_CAP]);
    }

    #[test]
    fn multi_char_ascii_chunk_is_raw_text() {
        let k = key(b"abc");
        assert_eq!(k.text.as_str(), Some("abc"));
        assert_eq!(k.char(), None);
    }

    // ── UTF-8 ───────────────────────────────────────────────────────────

    #[test]
    fn valid_utf8_lengths() {
        for s in ["é", "中", "😀", "\u{10FFFF}", "\u{80}", "\u{FFFF}"] {
            assert_eq!(key(s.as_bytes()).text.as_str(), Some(s));
        }
    }

    #[test]
    fn overlong_two_byte_rejected() {
        // C0 80 is an overlong NUL.
        let k = key(&[0xC0, 0x80]);
        assert_eq!(k.text.as_bytes(), &[0xC0, 0x80]);
        assert_eq!(k.text.as_str(), None);
    }

    #[test]
    fn overlong_three_and_four_byte_rejected() {
        assert_eq!(utf8_sequence_len(&[0xE0, 0x80, 0x80]), None);
        assert_eq!(utf8_sequence_len(&[0xF0, 0x80, 0x80, 0x80]), None);
    }

    #[test]
    fn surrogates_rejected() {
        assert_eq!(utf8_sequence_len(&[0xED, 0xA0, 0x80]), None);
        assert_eq!(utf8_sequence_len(&[0xED, 0x9F, 0xBF]), Some(3));
    }

    #[test]
    fn above_max_codepoint_rejected() {
        assert_eq!(utf8_sequence_len(&[0xF4, 0x90, 0x80, 0x80]), None);
        assert_eq!(utf8_sequence_len(&[0xF5, 0x80, 0x80, 0x80]), None);
    }

    #[test]
    fn truncated_sequence_rejected() {
        assert_eq!(utf8_sequence_len(&[0xE4, 0xB8]), None);
        let k = key(&[0xE4, 0xB8]);
        assert_eq!(k.text.as_bytes(), &[0xE4, 0xB8]);
    }

    #[test]
    fn bad_continuation_rejected() {
        assert_eq!(utf8_sequence_len(&[0xE4, 0xB8, 0x41]), None);
    }

    // ── Mouse ───────────────────────────────────────────────────────────

    #[test]
    fn mouse_press_release() {
        let ev = parse_mouse(b"\x1b[<0;1;1M").unwrap();
        assert_eq!(ev.button, MouseButton::Left);
        assert_eq!(ev.kind, MouseKind::Press);
        assert_eq!((ev.x, ev.y), (0, 0));

        let ev = parse_mouse(b"\x1b[<2;30;12m").unwrap();
        assert_eq!(ev.button, MouseButton::Right);
        assert_eq!(ev.kind, MouseKind::Release);
        assert_eq!((ev.x, ev.y), (29, 11));
    }

    #[test]
    fn mouse_wheel() {
        let up = parse_mouse(b"\x1b[<64;5;5M").unwrap();
        assert_eq!((up.button, up.kind), (MouseButton::WheelUp, MouseKind::Scroll));
        let down = parse_mouse(b"\x1b[<65;5;5M").unwrap();
        assert_eq!(down.button, MouseButton::WheelDown);
    }

    #[test]
    fn mouse_drag_and_move() {
        let drag = parse_mouse(b"\x1b[<32;5;5M").unwrap();
        assert_eq!((drag.button, drag.kind), (MouseButton::Left, MouseKind::Drag));
        let mv = parse_mouse(b"\x1b[<35;5;5M").unwrap();
        assert_eq!((mv.button, mv.kind), (MouseButton::None, MouseKind::Move));
    }

    #[test]
    fn mouse_modifiers() {
        let ev = parse_mouse(b"\x1b[<28;1;1M").unwrap();
        assert_eq!(ev.modifiers, Modifiers::SHIFT | Modifiers::META | Modifiers::CTRL);
        assert_eq!(ev.button, MouseButton::Left);
    }

    #[test]
    fn mouse_zero_coordinate_saturates() {
        let ev = parse_mouse(b"\x1b[<0;0;0M").unwrap();
        assert_eq!((ev.x, ev.y), (0, 0));
    }

    #[test]
    fn mouse_huge_numbers_saturate() {
        let ev = parse_mouse(b"\x1b[<0;999999999;70000M").unwrap();
        assert_eq!(ev.x, u16::MAX - 1);
        assert_eq!(ev.y, u16::MAX - 1);
    }

    #[test]
    fn mouse_malformed_is_none() {
        for seq in [
            &b""[..],
            b"\x1b[<",
            b"\x1b[<0;1",
            b"\x1b[<0;1;1",
            b"\x1b[<0;1;1X",
            b"\x1b[<;1;1M",
            b"\x1b[<a;1;1M",
            b"\x1b[0;1;1M",
        ] {
            assert_eq!(parse_mouse(seq), None, "{seq:?}");
        }
    }

    // ── Decoder ─────────────────────────────────────────────────────────

    #[test]
    fn decoder_dispatches() {
        let mut d = Decoder::new();
        assert!(matches!(d.feed(b"q"), Some(InputEvent::Key(k)) if k.char() == Some('q')));
        assert!(matches!(d.feed(b"\x1b[<0;2;3M"), Some(InputEvent::Mouse(_))));
        assert_eq!(d.feed(b"\x1b[I"), Some(InputEvent::FocusGained));
        assert_eq!(d.feed(b"\x1b[O"), Some(InputEvent::FocusLost));
        assert_eq!(d.feed(b""), None);
    }

    #[test]
    fn decode_unterminated_paste_takes_rest() {
        assert_eq!(decode(b"\x1b[200~partial"), Some(InputEvent::Paste("partial".into())));
    }

    #[test]
    fn decode_malformed_mouse_is_none() {
        assert_eq!(decode(b"\x1b[<0;1"), None);
    }

    #[test]
    fn decoder_paste_in_one_chunk() {
        let mut d = Decoder::new();
        assert_eq!(
            d.feed(b"\x1b[200~hello\nworld\x1b[201~"),
            Some(InputEvent::Paste("hello\nworld".into()))
        );
        assert!(!d.in_paste());
    }

    #[test]
    fn decoder_paste_across_chunks() {
        let mut d = Decoder::new();
        assert_eq!(d.feed(b"\x1b[200~abc"), None);
        assert!(d.in_paste());
        assert_eq!(d.feed(b"def\x1b[20"), None);
        assert_eq!(d.feed(b"1~"), Some(InputEvent::Paste("abcdef".into())));
        assert!(!d.in_paste());
    }

    #[test]
    fn decoder_keeps_bytes_after_paste_end() {
        let mut d = Decoder::new();
        assert_eq!(d.feed(b"\x1b[200~hi\x1b[201~q"), Some(InputEvent::Paste("hi".into())));
        assert!(matches!(d.take_queued(), Some(InputEvent::Key(k)) if k.char() == Some('q')));
        assert_eq!(d.take_queued(), None);

        assert_eq!(d.feed(b"\x1b[200~ab\x1b[2"), None);
        assert_eq!(d.feed(b"01~\x1b[200~cd\x1b[201~"), Some(InputEvent::Paste("ab".into())));
        assert_eq!(d.take_queued(), Some(InputEvent::Paste("cd".into())));
        assert!(!d.in_paste());
    }

    #[test]
    fn decoder_flushes_runaway_paste_at_cap() {
        let mut d = Decoder::with_paste_cap(16);
        assert_eq!(d.feed(b"\x1b[200~"), None);
        assert_eq!(d.feed(b"0123456789"), None);
        assert!(d.in_paste());
        assert_eq!(
            d.feed(b"abcdefgh"),
            Some(InputEvent::Paste("0123456789abcdefgh".into()))
        );
        assert!(!d.in_paste());
        assert!(matches!(d.feed(b"\x03"), Some(InputEvent::Key(k)) if k.is_ctrl('c')));
    }
}
