// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Event loop: input, timers, resize and coalesced rendering.
//
// Each iteration:
//
//   1. Block on the reader channel for min(tick, time until the next
//      timer). Input wakes the loop immediately; an idle loop sleeps.
//   2. Decode the chunk that woke us plus anything already queued, and
//      hand each event to the app.
//   3. If SIGWINCH fired since the last check, resize once. Any number of
//      signals between checks collapse into one resize.
//   4. Fire due timers.
//   5. If anything requested a render, paint, diff and flush one frame.
//
// Render requests only set a flag, so a burst of input produces a single
// frame. Timers are capped by `LoopConfig::max_timers`.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::ansi::{self, CursorShape};
use crate::buffer::FrameBuffer;
use crate::diff::DiffRenderer;
use crate::input::{DEFAULT_PASTE_CAP, Decoder, InputEvent};
use crate::reader::InputReader;
use crate::record::{FileRecorder, RecordError};
use crate::terminal::{Size, Terminal};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("timer limit of {max} reached")]
    TooManyTimers { max: usize },
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Record(#[from] RecordError),
}

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

/// Set by the signal handler, cleared by the loop.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
fn install_sigwinch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
fn install_sigwinch_handler() {}

// ─── Timers ──────────────────────────────────────────────────────────────────

/// Handle returned by [`LoopControl::add_timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Timer {
    id: TimerId,
    interval: Duration,
    due: Instant,
    repeat: bool,
    fired: bool,
}

/// Interval timers, scanned linearly. The set is small and capped.
#[derive(Debug)]
pub struct TimerQueue {
    timers: Vec<Timer>,
    next_id: u64,
    max: usize,
}

/// Shortest interval a timer may have.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl TimerQueue {
    #[must_use]
    pub const fn new(max: usize) -> Self {
        Self {
            timers: Vec::new(),
            next_id: 1,
            max,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id && !t.fired)
    }

    /// Schedule a timer `interval` after `now`. Intervals under 1 ms are
    /// raised to 1 ms.
    ///
    /// # Errors
    ///
    /// [`LoopError::TooManyTimers`] when the queue is full.
    pub fn add(&mut self, interval: Duration, repeat: bool, now: Instant) -> Result<TimerId, LoopError> {
        if self.timers.len() >= self.max {
            warn!(max = self.max, "timer rejected");
            return Err(LoopError::TooManyTimers { max: self.max });
        }
        let interval = interval.max(MIN_INTERVAL);
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            interval,
            due: now + interval,
            repeat,
            fired: false,
        });
        Ok(id)
    }

    /// Cancel a timer. Returns whether it was pending.
    pub fn remove(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Time until the earliest pending timer, zero if one is overdue.
    #[must_use]
    pub fn next_due(&self, now: Instant) -> Option<Duration> {
        self.timers
            .iter()
            .filter(|t| !t.fired)
            .map(|t| t.due.saturating_duration_since(now))
            .min()
    }

    /// Ids of every timer due at `now`, in id order.
    ///
    /// Repeating timers are rescheduled from `now` if they fell a whole
    /// interval behind, so a stalled loop does not fire a burst. One-shot
    /// timers stay in the queue marked fired until
    /// [`retire_fired`](Self::retire_fired); until then a
    /// [`remove`](Self::remove) still cancels them.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerId> {
        let mut due = Vec::new();
        for t in &mut self.timers {
            if t.fired || t.due > now {
                continue;
            }
            due.push(t.id);
            if t.repeat {
                t.due += t.interval;
                if t.due <= now {
                    t.due = now + t.interval;
                }
            } else {
                t.fired = true;
            }
        }
        due.sort_unstable();
        due
    }

    /// Whether `id` is still scheduled, or fired this scan and not yet
    /// retired.
    #[must_use]
    pub fn is_live(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// Drop one-shot timers that have fired.
    pub fn retire_fired(&mut self) {
        self.timers.retain(|t| !t.fired);
    }
}

// ─── App Trait ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Loop services available to the app from inside its callbacks.
#[derive(Debug)]
pub struct LoopControl {
    timers: TimerQueue,
    render_pending: bool,
}

impl LoopControl {
    #[must_use]
    pub const fn new(max_timers: usize) -> Self {
        Self {
            timers: TimerQueue::new(max_timers),
            render_pending: true,
        }
    }

    /// Schedule [`App::on_timer`] after `interval`, repeating if asked.
    ///
    /// # Errors
    ///
    /// [`LoopError::TooManyTimers`] when the cap is reached.
    pub fn add_timer(&mut self, interval: Duration, repeat: bool) -> Result<TimerId, LoopError> {
        self.timers.add(interval, repeat, Instant::now())
    }

    /// Cancel a timer. Takes effect before the next timer scan, including
    /// a scan already in progress.
    pub fn remove_timer(&mut self, id: TimerId) -> bool {
        self.timers.remove(id)
    }

    /// Ask for a frame. Repeated requests before the next frame coalesce.
    #[inline]
    pub const fn request_render(&mut self) {
        self.render_pending = true;
    }

    #[inline]
    #[must_use]
    pub const fn render_pending(&self) -> bool {
        self.render_pending
    }

    #[must_use]
    pub const fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    const fn take_render_request(&mut self) -> bool {
        let pending = self.render_pending;
        self.render_pending = false;
        pending
    }
}

/// An application driven by [`EventLoop`]. Only [`paint`](App::paint) is
/// required.
pub trait App {
    /// One decoded input event. A render is requested after every event.
    fn on_input(&mut self, _event: &InputEvent, _ctl: &mut LoopControl) -> Action {
        Action::Continue
    }

    /// The terminal was resized. The frame buffer already has the new size.
    fn on_resize(&mut self, _size: Size, _ctl: &mut LoopControl) {}

    /// A timer fired. Call [`LoopControl::request_render`] if the screen
    /// changed.
    fn on_timer(&mut self, _id: TimerId, _ctl: &mut LoopControl) -> Action {
        Action::Continue
    }

    /// Called every iteration. Return `true` to request a render.
    fn on_tick(&mut self) -> bool {
        false
    }

    /// Paint the whole screen. The buffer is cleared beforehand.
    fn paint(&mut self, buf: &mut FrameBuffer);

    /// Where to show the hardware cursor after a frame, or `None` to hide
    /// it.
    fn cursor(&self) -> Option<(u16, u16, CursorShape)> {
        None
    }
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Longest the loop blocks waiting for input, in microseconds.
    pub tick_interval_us: u64,
    pub max_timers: usize,
    /// Bracketed paste bytes buffered before an unterminated paste is
    /// delivered as is.
    pub max_paste_bytes: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval_us: 8333, // 120 Hz
            max_timers: 64,
            max_paste_bytes: DEFAULT_PASTE_CAP,
        }
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// Owns the terminal, decoder, renderer and optional recorder.
///
/// ```no_run
/// use weft_term::buffer::{CellStyle, FrameBuffer};
/// use weft_term::event_loop::{Action, App, EventLoop, LoopControl};
/// use weft_term::input::InputEvent;
///
/// struct Hello;
///
/// impl App for Hello {
///     fn on_input(&mut self, event: &InputEvent, _ctl: &mut LoopControl) -> Action {
///         match event {
///             InputEvent::Key(k) if k.char() == Some('q') => Action::Quit,
///             _ => Action::Continue,
///         }
///     }
///
///     fn paint(&mut self, buf: &mut FrameBuffer) {
///         buf.write_text(0, 0, "hello", CellStyle::default(), None);
///     }
/// }
///
/// EventLoop::new().run(&mut Hello)?;
/// # Ok::<(), weft_term::event_loop::LoopError>(())
/// ```
pub struct EventLoop {
    terminal: Terminal,
    decoder: Decoder,
    renderer: DiffRenderer,
    control: LoopControl,
    recorder: Option<FileRecorder>,
    config: LoopConfig,
}

impl EventLoop {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    #[must_use]
    pub fn with_config(config: LoopConfig) -> Self {
        Self::with_terminal(Terminal::new(), config)
    }

    #[must_use]
    pub fn with_terminal(terminal: Terminal, config: LoopConfig) -> Self {
        Self {
            terminal,
            decoder: Decoder::with_paste_cap(config.max_paste_bytes),
            renderer: DiffRenderer::new(),
            control: LoopControl::new(config.max_timers),
            recorder: None,
            config,
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.terminal.size()
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Timers and render requests, for setup before [`run`](Self::run).
    pub const fn control(&mut self) -> &mut LoopControl {
        &mut self.control
    }

    /// Capture every frame written to the terminal.
    pub fn set_recorder(&mut self, recorder: FileRecorder) {
        self.recorder = Some(recorder);
    }

    /// Take the recorder back, e.g. to [`finish`](crate::record::Recorder::finish) it.
    pub fn take_recorder(&mut self) -> Option<FileRecorder> {
        self.recorder.take()
    }

    /// Enter the terminal, run until the app quits or stdin closes, and
    /// restore the terminal.
    ///
    /// # Errors
    ///
    /// Terminal I/O errors. The terminal is restored before returning.
    pub fn run(&mut self, app: &mut impl App) -> Result<(), LoopError> {
        self.terminal.enter()?;
        install_sigwinch_handler();

        let (mut reader, rx) = InputReader::spawn();
        let result = {
            let mut stdout = io::stdout();
            self.drive(app, &rx, &mut stdout)
        };

        reader.stop();
        self.terminal.leave()?;
        result
    }

    /// The loop itself, reading chunks from `rx` and writing frames to
    /// `out`. Returns when the app quits or the channel disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn drive(&mut self, app: &mut impl App, rx: &Receiver<Vec<u8>>, out: &mut impl Write) -> Result<(), LoopError> {
        let size = self.terminal.size();
        let mut frame = FrameBuffer::new(size.cols, size.rows);
        let tick = Duration::from_micros(self.config.tick_interval_us);
        self.control.request_render();

        loop {
            let wait = self
                .control
                .timers
                .next_due(Instant::now())
                .map_or(tick, |d| d.min(tick));

            match rx.recv_timeout(wait) {
                Ok(chunk) => {
                    if self.dispatch(app, &chunk) == Action::Quit {
                        return Ok(());
                    }
                    while let Ok(chunk) = rx.try_recv() {
                        if self.dispatch(app, &chunk) == Action::Quit {
                            return Ok(());
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("input channel closed");
                    return Ok(());
                }
            }

            if SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed) {
                self.handle_resize(app, &mut frame);
            }

            if self.fire_timers(app) == Action::Quit {
                return Ok(());
            }

            if app.on_tick() {
                self.control.request_render();
            }

            if self.control.take_render_request() {
                self.render(app, &mut frame, out)?;
            }
        }
    }

    fn dispatch(&mut self, app: &mut impl App, chunk: &[u8]) -> Action {
        let mut next = self.decoder.feed(chunk);
        while let Some(event) = next {
            trace!(?event, "input");
            self.control.request_render();
            if app.on_input(&event, &mut self.control) == Action::Quit {
                return Action::Quit;
            }
            next = self.decoder.take_queued();
        }
        Action::Continue
    }

    fn handle_resize(&mut self, app: &mut impl App, frame: &mut FrameBuffer) {
        let size = self.terminal.refresh_size();
        debug!(cols = size.cols, rows = size.rows, "resize");
        frame.resize(size.cols, size.rows);
        self.renderer.force_redraw();
        if let Some(rec) = self.recorder.as_mut() {
            if let Err(e) = rec.resize(size.cols, size.rows) {
                warn!(error = %e, "recording stopped");
                self.recorder = None;
            }
        }
        app.on_resize(size, &mut self.control);
        self.control.request_render();
    }

    fn fire_timers(&mut self, app: &mut impl App) -> Action {
        let due = self.control.timers.take_due(Instant::now());
        let mut action = Action::Continue;
        for id in due {
            // An earlier callback in this scan may have cancelled it.
            if !self.control.timers.is_live(id) {
                continue;
            }
            if app.on_timer(id, &mut self.control) == Action::Quit {
                action = Action::Quit;
                break;
            }
        }
        self.control.timers.retire_fired();
        action
    }

    fn render(&mut self, app: &mut impl App, frame: &mut FrameBuffer, out: &mut impl Write) -> Result<(), LoopError> {
        frame.clear();
        app.paint(frame);
        self.renderer.render(frame);

        if let Some(rec) = self.recorder.as_mut() {
            if let Err(e) = rec.output(self.renderer.output_bytes()) {
                warn!(error = %e, "recording stopped");
                self.recorder = None;
            }
        }
        self.renderer.flush_to(out)?;

        match app.cursor() {
            Some((x, y, shape)) => {
                ansi::cursor_to(out, x, y)?;
                ansi::set_cursor_shape(out, shape)?;
                ansi::cursor_show(out)?;
            }
            None => ansi::cursor_hide(out)?,
        }
        out.flush()?;
        Ok(())
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CellStyle;
    use std::sync::mpsc;

    // ── Config ──────────────────────────────────────────────────────────

    #[test]
    fn default_config() {
        let c = LoopConfig::default();
        assert_eq!(c.tick_interval_us, 8333);
        assert_eq!(c.max_timers, 64);
    }

    // ── TimerQueue ──────────────────────────────────────────────────────

    #[test]
    fn timer_fires_when_due() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new(4);
        let id = q.add(Duration::from_millis(10), false, t0).unwrap();

        assert!(q.take_due(t0 + Duration::from_millis(5)).is_empty());
        assert_eq!(q.take_due(t0 + Duration::from_millis(10)), vec![id]);
        q.retire_fired();
        assert!(q.is_empty());
    }

    #[test]
    fn repeating_timer_reschedules() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new(4);
        let id = q.add(Duration::from_millis(10), true, t0).unwrap();

        assert_eq!(q.take_due(t0 + Duration::from_millis(10)), vec![id]);
        q.retire_fired();
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_due(t0 + Duration::from_millis(10)), Some(Duration::from_millis(10)));
    }

    #[test]
    fn stalled_repeating_timer_fires_once() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new(4);
        q.add(Duration::from_millis(10), true, t0).unwrap();
        let late = t0 + Duration::from_millis(100);
        assert_eq!(q.take_due(late).len(), 1);
        assert!(q.take_due(late).is_empty());
    }

    #[test]
    fn timer_cap_enforced() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new(2);
        q.add(Duration::from_millis(1), false, t0).unwrap();
        q.add(Duration::from_millis(1), false, t0).unwrap();
        let err = q.add(Duration::from_millis(1), false, t0).unwrap_err();
        assert!(matches!(err, LoopError::TooManyTimers { max: 2 }));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn removed_timer_does_not_fire() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new(4);
        let id = q.add(Duration::from_millis(5), true, t0).unwrap();
        assert!(q.remove(id));
        assert!(!q.remove(id));
        assert!(q.take_due(t0 + Duration::from_secs(1)).is_empty());
        assert_eq!(q.next_due(t0), None);
    }

    #[test]
    fn zero_interval_is_raised() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new(1);
        q.add(Duration::ZERO, true, t0).unwrap();
        assert_eq!(q.next_due(t0), Some(MIN_INTERVAL));
    }

    #[test]
    fn due_ids_are_ordered() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new(4);
        let a = q.add(Duration::from_millis(3), false, t0).unwrap();
        let b = q.add(Duration::from_millis(1), false, t0).unwrap();
        assert_eq!(q.take_due(t0 + Duration::from_millis(5)), vec![a, b]);
    }

    // ── Render coalescing ───────────────────────────────────────────────

    #[test]
    fn render_requests_coalesce() {
        let mut ctl = LoopControl::new(4);
        assert!(ctl.take_render_request());
        ctl.request_render();
        ctl.request_render();
        assert!(ctl.take_render_request());
        assert!(!ctl.take_render_request());
    }

    // ── Driving the loop ────────────────────────────────────────────────

    #[derive(Default)]
    struct Counter {
        keys: usize,
        paints: usize,
        timer_fires: usize,
    }

    impl App for Counter {
        fn on_input(&mut self, event: &InputEvent, _ctl: &mut LoopControl) -> Action {
            match event {
                InputEvent::Key(k) if k.char() == Some('q') => Action::Quit,
                InputEvent::Key(_) => {
                    self.keys += 1;
                    Action::Continue
                }
                _ => Action::Continue,
            }
        }

        fn on_timer(&mut self, _id: TimerId, _ctl: &mut LoopControl) -> Action {
            self.timer_fires += 1;
            if self.timer_fires == 3 { Action::Quit } else { Action::Continue }
        }

        fn paint(&mut self, buf: &mut FrameBuffer) {
            self.paints += 1;
            buf.write_text(0, 0, &format!("keys={}", self.keys), CellStyle::default(), None);
        }
    }

    fn headless() -> EventLoop {
        let config = LoopConfig {
            tick_interval_us: 1000,
            max_timers: 4,
            max_paste_bytes: 64,
        };
        EventLoop::with_config(config)
    }

    #[test]
    fn quit_key_stops_loop() {
        let (tx, rx) = mpsc::channel();
        tx.send(b"a".to_vec()).unwrap();
        tx.send(b"b".to_vec()).unwrap();
        tx.send(b"q".to_vec()).unwrap();

        let mut app = Counter::default();
        let mut out = Vec::new();
        headless().drive(&mut app, &rx, &mut out).unwrap();

        assert_eq!(app.keys, 2);
    }

    #[test]
    fn key_after_paste_end_reaches_app() {
        let (tx, rx) = mpsc::channel();
        tx.send(b"\x1b[200~pasted\x1b[201~a".to_vec()).unwrap();
        tx.send(b"\x1b[200~".to_vec()).unwrap();
        tx.send(vec![b'z'; 80]).unwrap();
        tx.send(b"x".to_vec()).unwrap();
        tx.send(b"q".to_vec()).unwrap();
        tx.send(b"b".to_vec()).unwrap();
        drop(tx);

        let mut app = Counter::default();
        let mut out = Vec::new();
        headless().drive(&mut app, &rx, &mut out).unwrap();

        // `a` and `x` count; the runaway paste is flushed at the cap so `q`
        // still quits before `b`.
        assert_eq!(app.keys, 2);
    }

    #[test]
    fn queued_input_renders_once() {
        let (tx, rx) = mpsc::channel();
        for _ in 0..5 {
            tx.send(b"x".to_vec()).unwrap();
        }
        drop(tx);

        let mut app = Counter::default();
        let mut out = Vec::new();
        headless().drive(&mut app, &rx, &mut out).unwrap();

        assert_eq!(app.keys, 5);
        assert_eq!(app.paints, 1);
        assert!(String::from_utf8_lossy(&out).contains("keys=5"));
    }

    #[test]
    fn repeating_timer_drives_app() {
        let (_tx, rx) = mpsc::channel::<Vec<u8>>();
        let mut app = Counter::default();
        let mut ev = headless();
        ev.control().add_timer(Duration::from_millis(2), true).unwrap();
        let mut out = Vec::new();
        ev.drive(&mut app, &rx, &mut out).unwrap();
        assert_eq!(app.timer_fires, 3);
    }

    #[test]
    fn disconnected_channel_ends_loop() {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        drop(tx);
        let mut app = Counter::default();
        let mut out = Vec::new();
        headless().drive(&mut app, &rx, &mut out).unwrap();
        assert_eq!(app.paints, 0);
    }

    #[test]
    fn sigwinch_flag_swaps_once() {
        SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
        SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
        assert!(SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed));
        assert!(!SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed));
    }
}
