// SPDX-License-Identifier: MIT
//
// Terminal driver: raw mode, alternate screen, input reporting modes, and
// guaranteed restore.
//
// Safety: termios (tcgetattr/tcsetattr), ioctl(TIOCGWINSZ), isatty and the
// raw fd write in the panic hook have no safe std equivalent. Each unsafe
// block is a single libc call.
#![allow(unsafe_code)]
//
// Which modes get switched on is described by `TermOptions`; `leave()` and
// `Drop` undo exactly those. A panic while in TUI mode runs a hook that
// writes a fixed restore sequence straight to fd 1 (the stdout lock may be
// held by the frame that panicked), restores termios from a global backup,
// then hands off to the previous hook so the message lands on a sane
// terminal.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use crate::ansi::{self, MouseMode};

const FALLBACK_SIZE: Size = Size { cols: 80, rows: 24 };

// ─── Size ────────────────────────────────────────────────────────────────────

/// Terminal dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Current size of the terminal on stdout, or `None` if stdout is not a
/// terminal.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    (rc == 0 && ws.ws_col > 0 && ws.ws_row > 0).then_some(Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    })
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Whether stdin is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Options ─────────────────────────────────────────────────────────────────

/// Terminal modes switched on by [`Terminal::enter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermOptions {
    pub alt_screen: bool,
    /// `None` leaves mouse reporting off.
    pub mouse: Option<MouseMode>,
    pub bracketed_paste: bool,
    pub focus_reporting: bool,
}

impl Default for TermOptions {
    fn default() -> Self {
        Self {
            alt_screen: true,
            mouse: Some(MouseMode::Drag),
            bracketed_paste: true,
            focus_reporting: true,
        }
    }
}

/// Write the mode-switch sequence for `opts`.
///
/// # Errors
///
/// Returns an error if writing to `w` fails.
pub fn write_enter(w: &mut impl Write, opts: &TermOptions) -> io::Result<()> {
    if opts.alt_screen {
        ansi::enter_alt_screen(w)?;
    }
    ansi::cursor_hide(w)?;
    ansi::clear_screen(w)?;
    if let Some(mode) = opts.mouse {
        ansi::enable_mouse(w, mode)?;
    }
    if opts.bracketed_paste {
        ansi::enable_bracketed_paste(w)?;
    }
    if opts.focus_reporting {
        ansi::enable_focus_reporting(w)?;
    }
    Ok(())
}

/// Write the sequence that undoes [`write_enter`], alternate screen last.
///
/// # Errors
///
/// Returns an error if writing to `w` fails.
pub fn write_leave(w: &mut impl Write, opts: &TermOptions) -> io::Result<()> {
    ansi::end_sync(w)?;
    if opts.focus_reporting {
        ansi::disable_focus_reporting(w)?;
    }
    if opts.bracketed_paste {
        ansi::disable_bracketed_paste(w)?;
    }
    if opts.mouse.is_some() {
        ansi::disable_mouse(w)?;
    }
    ansi::reset(w)?;
    ansi::set_cursor_shape(w, ansi::CursorShape::Default)?;
    ansi::cursor_show(w)?;
    if opts.alt_screen {
        ansi::exit_alt_screen(w)?;
    }
    Ok(())
}

// ─── Panic Restore ───────────────────────────────────────────────────────────

#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(original) = guard.as_ref() {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Everything [`write_leave`] could emit, regardless of options.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[?1004l\
    \x1b[?2004l\
    \x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l\
    \x1b[0m\
    \x1b[0 q\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            #[cfg(unix)]
            restore_termios_from_backup();
            previous(info);
        }));
    });
}

/// Write [`EMERGENCY_RESTORE`] to fd 1 without taking the stdout lock.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Terminal ────────────────────────────────────────────────────────────────

/// Owns the terminal's TUI state and restores it on drop.
///
/// ```no_run
/// use weft_term::terminal::{Terminal, TermOptions};
///
/// let mut term = Terminal::with_options(TermOptions { mouse: None, ..TermOptions::default() });
/// term.enter()?;
/// // ... frames ...
/// term.leave()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    #[cfg(unix)]
    original_termios: Option<libc::termios>,
    options: TermOptions,
    size: Size,
    active: bool,
}

impl Terminal {
    /// A handle with default options. Size falls back to 80×24 when stdout
    /// is not a terminal.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(TermOptions::default())
    }

    #[must_use]
    pub fn with_options(options: TermOptions) -> Self {
        Self {
            #[cfg(unix)]
            original_termios: None,
            options,
            size: get_size().unwrap_or(FALLBACK_SIZE),
            active: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn options(&self) -> &TermOptions {
        &self.options
    }

    /// Re-query the size after a resize. Keeps the cached size if the query
    /// fails.
    pub fn refresh_size(&mut self) -> Size {
        if let Some(s) = get_size() {
            self.size = s;
        }
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Enter raw mode and switch on the configured modes. No-op when
    /// already active.
    ///
    /// # Errors
    ///
    /// Returns an error if termios or the terminal write fails.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        install_panic_hook();
        self.enable_raw_mode()?;

        let mut lock = io::stdout().lock();
        write_enter(&mut lock, &self.options)?;
        lock.flush()?;

        self.active = true;
        Ok(())
    }

    /// Undo everything [`enter`](Self::enter) did. No-op when inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal write or termios restore fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }

        let mut lock = io::stdout().lock();
        write_leave(&mut lock, &self.options)?;
        lock.flush()?;
        drop(lock);

        self.disable_raw_mode()?;
        self.active = false;
        Ok(())
    }

    // ── termios ─────────────────────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        if !is_tty() {
            return Ok(());
        }
        let fd = io::stdin().as_raw_fd();

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            self.original_termios = Some(termios);
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            libc::cfmakeraw(&raw mut termios);
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let Some(original) = self.original_termios.take() else {
            return Ok(());
        };
        let fd = io::stdin().as_raw_fd();
        unsafe {
            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const original) != 0 {
                self.original_termios = Some(original);
                return Err(io::Error::last_os_error());
            }
        }
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
