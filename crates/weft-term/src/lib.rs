// SPDX-License-Identifier: MIT
//
// weft-term: the terminal half of the weft TUI engine.
//
// Cells and colors, grapheme width, the frame buffer the compositor paints
// into, ANSI encoding and differential output, the input decoder, the
// terminal driver, the stdin reader, the event loop, and an asciicast
// recorder. Everything talks to the terminal through escape sequences and
// raw termios directly.

pub mod ansi;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod diff;
pub mod event_loop;
pub mod input;
pub mod output;
pub mod reader;
pub mod record;
pub mod terminal;
pub mod width;
