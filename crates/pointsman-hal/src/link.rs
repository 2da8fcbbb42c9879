//! Physical transport.
//!
//! The controller's secondary interface accepts newline-terminated script
//! lines and sends nothing back that correlates with individual commands, so
//! a [`CommandLink`] is write-only. A dropped connection or a command the
//! controller cannot parse is invisible at this layer.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

/// Write-only command link to the physical controller.
pub trait CommandLink: Send {
    /// Human-readable peer description, e.g. `"192.168.1.5:30002"`.
    fn peer(&self) -> String;

    /// Write `command` followed by a single `\n`.
    ///
    /// # Errors
    ///
    /// Fails when the link is closed, when `command` contains a line break
    /// (it would reach the controller as two commands), or when the
    /// underlying write fails.
    fn send(&mut self, command: &str) -> io::Result<()>;

    /// Release the connection. Closing an already closed link is a no-op.
    fn close(&mut self) -> io::Result<()>;

    fn is_open(&self) -> bool;
}

fn reject_multiline(command: &str) -> io::Result<()> {
    if command.contains(['\n', '\r']) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "command must be a single line",
        ));
    }
    Ok(())
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "link is closed")
}

// ────────────────────────────────────────────────────────────────────────────
// TCP link
// ────────────────────────────────────────────────────────────────────────────

/// [`CommandLink`] over an already connected TCP stream.
///
/// Obtained from [`probe`][crate::probe::probe]; the same connection is kept
/// for the whole session. The stream is shut down on [`close`] or on drop,
/// whichever comes first.
///
/// [`close`]: CommandLink::close
pub struct TcpLink {
    stream: Option<TcpStream>,
    peer: SocketAddr,
}

impl TcpLink {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream: Some(stream),
            peer,
        }
    }
}

impl CommandLink for TcpLink {
    fn peer(&self) -> String {
        self.peer.to_string()
    }

    fn send(&mut self, command: &str) -> io::Result<()> {
        reject_multiline(command)?;
        let stream = self.stream.as_mut().ok_or_else(closed)?;
        let mut line = String::with_capacity(command.len() + 1);
        line.push_str(command);
        line.push('\n');
        stream.write_all(line.as_bytes())?;
        stream.flush()?;
        debug!(peer = %self.peer, command, "sent");
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(stream) => {
                debug!(peer = %self.peer, "closing controller link");
                match stream.shutdown(Shutdown::Both) {
                    // The peer may already have gone away; the socket is
                    // released either way once `stream` drops.
                    Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
                    other => other,
                }
            }
            None => Ok(()),
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(peer = %self.peer, error = %e, "failed to shut down controller link");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recording link
// ────────────────────────────────────────────────────────────────────────────

/// Traffic captured by a [`RecordingLink`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkJournal {
    /// Every successfully sent command, without the trailing newline.
    pub sent: Vec<String>,
    /// Number of `send` calls, including failed ones.
    pub send_calls: usize,
    /// Number of `close` calls.
    pub close_calls: usize,
}

/// In-process [`CommandLink`] that records traffic instead of writing to a
/// socket.
///
/// The journal is shared, so a test can keep a handle after moving the link
/// into a session. Optionally fails every send from a given call onwards to
/// emulate a dropped connection.
#[derive(Clone)]
pub struct RecordingLink {
    journal: Arc<Mutex<LinkJournal>>,
    open: bool,
    fail_from: Option<usize>,
}

impl Default for RecordingLink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingLink {
    pub fn new() -> Self {
        Self {
            journal: Arc::new(Mutex::new(LinkJournal::default())),
            open: true,
            fail_from: None,
        }
    }

    /// Make the `n`-th send (zero-based, counted across the link's lifetime)
    /// and every later one fail with `BrokenPipe`.
    pub fn failing_from(mut self, n: usize) -> Self {
        self.fail_from = Some(n);
        self
    }

    /// Snapshot of the traffic so far.
    pub fn journal(&self) -> LinkJournal {
        self.lock().clone()
    }

    /// Shared handle to the journal, valid after the link itself is moved.
    pub fn journal_handle(&self) -> Arc<Mutex<LinkJournal>> {
        Arc::clone(&self.journal)
    }

    fn lock(&self) -> MutexGuard<'_, LinkJournal> {
        self.journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CommandLink for RecordingLink {
    fn peer(&self) -> String {
        "recording".to_string()
    }

    fn send(&mut self, command: &str) -> io::Result<()> {
        let fail_from = self.fail_from;
        let open = self.open;
        let mut journal = self.lock();
        let call = journal.send_calls;
        journal.send_calls += 1;
        if !open {
            return Err(closed());
        }
        reject_multiline(command)?;
        if fail_from.is_some_and(|n| call >= n) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection dropped"));
        }
        journal.sent.push(command.to_string());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.lock().close_calls += 1;
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
