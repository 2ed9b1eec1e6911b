// SPDX-License-Identifier: MIT
//
// Session recorder in asciicast v2 format.
//
// The file is newline-delimited JSON: one header object, then one event
// array per line.
//
//   {"version":2,"width":80,"height":24,"timestamp":1700000000,"title":"weft"}
//   [0.016, "o", "\u001b[?2026h..."]
//   [1.250, "r", "100x30"]
//
// Times are seconds since the recorder was created. "o" events carry the
// exact bytes the renderer wrote (lossily decoded; the renderer only emits
// UTF-8). The frame count is capped so a runaway session cannot fill the
// disk.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

// ─── Config & Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordConfig {
    pub width: u16,
    pub height: u16,
    pub title: String,
    /// Output events accepted before [`RecordError::FrameLimit`].
    pub max_frames: usize,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            title: String::from("weft"),
            max_frames: 100_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("recording I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("recording encode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("recording reached its limit of {max} frames")]
    FrameLimit { max: usize },
}

// ─── Wire Types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Header<'a> {
    version: u8,
    width: u16,
    height: u16,
    timestamp: u64,
    title: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventCode {
    Output,
    Resize,
}

impl EventCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Output => "o",
            Self::Resize => "r",
        }
    }
}

// ─── Recorder ────────────────────────────────────────────────────────────────

/// A recorder writing to a buffered file.
pub type FileRecorder = Recorder<BufWriter<File>>;

/// Writes an asciicast v2 stream to `W`.
///
/// ```
/// use std::time::Duration;
/// use weft_term::record::{RecordConfig, Recorder};
///
/// let mut rec = Recorder::new(Vec::new(), RecordConfig::default())?;
/// rec.output_at(Duration::from_millis(500), b"hi")?;
/// let bytes = rec.finish()?;
/// let text = String::from_utf8(bytes).unwrap();
/// assert!(text.lines().nth(1).unwrap().starts_with("[0.5,\"o\",\"hi\"]"));
/// # Ok::<(), weft_term::record::RecordError>(())
/// ```
pub struct Recorder<W: Write> {
    out: W,
    started: Instant,
    frames: usize,
    max_frames: usize,
}

impl FileRecorder {
    /// Create (or truncate) `path` and write the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn create(path: impl AsRef<Path>, config: RecordConfig) -> Result<Self, RecordError> {
        let file = File::create(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "recording started");
        Self::new(BufWriter::new(file), config)
    }
}

impl<W: Write> Recorder<W> {
    /// Write the header to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the header fails.
    pub fn new(mut out: W, config: RecordConfig) -> Result<Self, RecordError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let header = Header {
            version: 2,
            width: config.width,
            height: config.height,
            timestamp,
            title: &config.title,
        };
        serde_json::to_writer(&mut out, &header)?;
        out.write_all(b"\n")?;

        Ok(Self {
            out,
            started: Instant::now(),
            frames: 0,
            max_frames: config.max_frames,
        })
    }

    /// Output events written so far.
    #[inline]
    #[must_use]
    pub const fn frames(&self) -> usize {
        self.frames
    }

    /// Record renderer output, timestamped now.
    ///
    /// # Errors
    ///
    /// [`RecordError::FrameLimit`] once the cap is reached (nothing is
    /// written), or an I/O / encode error.
    pub fn output(&mut self, data: &[u8]) -> Result<(), RecordError> {
        self.output_at(self.started.elapsed(), data)
    }

    /// Record renderer output at an explicit offset from the start.
    ///
    /// # Errors
    ///
    /// Same as [`output`](Self::output).
    pub fn output_at(&mut self, elapsed: Duration, data: &[u8]) -> Result<(), RecordError> {
        if self.frames >= self.max_frames {
            warn!(max = self.max_frames, "recording frame limit reached");
            return Err(RecordError::FrameLimit { max: self.max_frames });
        }
        self.write_event(elapsed, EventCode::Output, &String::from_utf8_lossy(data))?;
        self.frames += 1;
        Ok(())
    }

    /// Record a terminal resize. Does not count toward the frame cap.
    ///
    /// # Errors
    ///
    /// Returns an I/O or encode error.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), RecordError> {
        let size = format!("{cols}x{rows}");
        self.write_event(self.started.elapsed(), EventCode::Resize, &size)
    }

    /// Flush and hand back the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn finish(mut self) -> Result<W, RecordError> {
        self.out.flush()?;
        debug!(frames = self.frames, "recording finished");
        Ok(self.out)
    }

    fn write_event(&mut self, elapsed: Duration, code: EventCode, data: &str) -> Result<(), RecordError> {
        let secs = (elapsed.as_secs_f64() * 1_000_000.0).round() / 1_000_000.0;
        serde_json::to_writer(&mut self.out, &(secs, code.as_str(), data))?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
