//! Open-loop waiting between physical commands.

use std::time::Duration;

use tracing::trace;

/// Blocks the dispatching thread for a calibrated duration.
///
/// This is the only synchronisation the physical channel has. A wait that is
/// shorter than the real move means the next command is queued behind a move
/// still in progress; nothing detects that.
pub trait Pacer: Send {
    fn wait(&mut self, duration: Duration);
}

/// [`Pacer`] backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn wait(&mut self, duration: Duration) {
        trace!(?duration, "open-loop wait");
        std::thread::sleep(duration);
    }
}

/// [`Pacer`] that records requested waits and returns immediately.
#[derive(Debug, Default, Clone)]
pub struct RecordingPacer {
    waits: Vec<Duration>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    /// Sum of every requested wait.
    pub fn total(&self) -> Duration {
        self.waits.iter().sum()
    }
}

impl Pacer for RecordingPacer {
    fn wait(&mut self, duration: Duration) {
        self.waits.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn thread_pacer_sleeps_at_least_the_requested_duration() {
        let start = Instant::now();
        ThreadPacer.wait(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn recording_pacer_accumulates() {
        let mut pacer = RecordingPacer::new();
        pacer.wait(Duration::from_secs(1));
        pacer.wait(Duration::from_secs(4));
        assert_eq!(pacer.waits().len(), 2);
        assert_eq!(pacer.total(), Duration::from_secs(5));
    }
}
