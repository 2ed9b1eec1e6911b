// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background input reader.
//
// A dedicated thread reads raw bytes and forwards each read as one chunk
// over an mpsc channel. The event loop blocks on that channel with a
// timeout, so it stays free to fire timers and handle resizes.
//
// On unix the stdin thread polls the fd with a short timeout and checks a
// stop flag between polls, so `stop()` never waits on a blocked read().
// `spawn_from` reads any `Read` source instead; it stops at EOF or when the
// receiver goes away.

#[cfg(unix)]
use std::io;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::debug;

/// One read. A keypress is a few bytes; a paste can be kilobytes.
const READ_BUF_SIZE: usize = 4096;

/// Upper bound on shutdown latency for the stdin thread.
#[cfg(unix)]
const POLL_TIMEOUT_MS: i32 = 50;

/// Handle to the reader thread. Dropping it stops the thread.
///
/// ```no_run
/// use weft_term::reader::InputReader;
///
/// let (reader, rx) = InputReader::spawn();
/// while let Ok(chunk) = rx.recv() {
///     println!("{} bytes", chunk.len());
/// }
/// drop(reader);
/// ```
pub struct InputReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl InputReader {
    /// Read stdin on a background thread.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn a thread.
    #[must_use]
    pub fn spawn() -> (Self, Receiver<Vec<u8>>) {
        Self::start(|tx, stop| stdin_loop(&tx, &stop))
    }

    /// Read `source` on a background thread until EOF.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn a thread.
    #[must_use]
    pub fn spawn_from<R: Read + Send + 'static>(source: R) -> (Self, Receiver<Vec<u8>>) {
        Self::start(move |tx, stop| source_loop(source, &tx, &stop))
    }

    fn start(body: impl FnOnce(Sender<Vec<u8>>, Arc<AtomicBool>) + Send + 'static) -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("input-reader".into())
            .spawn(move || body(tx, stop_flag))
            .expect("failed to spawn input reader thread");

        (
            Self {
                handle: Some(handle),
                stop,
            },
            rx,
        )
    }

    /// Signal the thread and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
fn stdin_loop(tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    use std::os::unix::io::AsRawFd;

    let fd = io::stdin().as_raw_fd();
    let mut buf = [0u8; READ_BUF_SIZE];

    while !stop.load(Ordering::Relaxed) {
        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
        };
        if ready <= 0 {
            continue;
        }

        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n <= 0 {
            debug!("stdin closed");
            break;
        }
        // n > 0 checked above.
        #[allow(clippy::cast_sign_loss)]
        let chunk = buf[..n as usize].to_vec();
        if tx.send(chunk).is_err() {
            break;
        }
    }
}

#[cfg(not(unix))]
fn stdin_loop(tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    source_loop(std::io::stdin(), tx, stop);
}

fn source_loop(mut source: impl Read, tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    let mut buf = [0u8; READ_BUF_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!(error = %e, "input source failed");
                break;
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    #[test]
    fn source_bytes_arrive_then_channel_closes() {
        let (_reader, rx) = InputReader::spawn_from(Cursor::new(b"hello".to_vec()));
        let mut got = Vec::new();
        while let Ok(chunk) = rx.recv_timeout(Duration::from_secs(1)) {
            got.extend(chunk);
        }
        assert_eq!(got, b"hello");
    }

    #[test]
    fn large_source_is_chunked() {
        let data = vec![b'x'; READ_BUF_SIZE * 2 + 10];
        let (_reader, rx) = InputReader::spawn_from(Cursor::new(data));
        let chunks: Vec<Vec<u8>> = rx.iter().collect();
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.len() <= READ_BUF_SIZE));
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), READ_BUF_SIZE * 2 + 10);
    }

    #[test]
    fn stdin_reader_stops_cleanly() {
        let (mut reader, _rx) = InputReader::spawn();
        reader.stop();
        reader.stop();
    }

    #[test]
    fn drop_joins_thread() {
        let (reader, rx) = InputReader::spawn_from(Cursor::new(Vec::new()));
        drop(reader);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
