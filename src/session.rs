//! Redirection session management.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::pipeline::{EventListener, ReassignerHandle};
use crate::server::SinkInfo;
use crate::RedirectError;

/// Statistics about a redirection session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectStats {
    /// New playback streams queued by the listener.
    pub streams_dispatched: u64,
    /// Streams successfully moved to the target sink.
    pub moves_completed: u64,
    /// Moves that failed.
    pub moves_failed: u64,
}

/// Internal state shared between the session and its two threads.
pub(crate) struct SessionState {
    pub running: AtomicBool,
    pub streams_dispatched: AtomicU64,
    pub moves_completed: AtomicU64,
    pub moves_failed: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            streams_dispatched: AtomicU64::new(0),
            moves_completed: AtomicU64::new(0),
            moves_failed: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> RedirectStats {
        RedirectStats {
            streams_dispatched: self.streams_dispatched.load(Ordering::SeqCst),
            moves_completed: self.moves_completed.load(Ordering::SeqCst),
            moves_failed: self.moves_failed.load(Ordering::SeqCst),
        }
    }
}

/// Handle to a started redirection session.
///
/// The `Session` is returned by [`SinkRedirectBuilder::start()`]. At that
/// point the target sink is resolved, the reassigner thread is running with
/// its own connection, and the listener is subscribed. Nothing is delivered
/// until [`run()`](Session::run) enters the event loop.
///
/// # Lifecycle
///
/// 1. Created by [`SinkRedirectBuilder::start()`]
/// 2. [`run()`](Session::run) blocks the calling thread in the event loop
/// 3. It returns only when the listener's connection ends
/// 4. The reassigner then drains the queue and stops on its own
///
/// # Example
///
/// ```ignore
/// let session = SinkRedirect::builder()
///     .target_sink("alsa_output.pci-0000_00_1f.3.analog-stereo")
///     .start(Arc::from(create_connector()?))?;
///
/// println!("moving new streams to {}", session.sink().id);
/// session.run()?;
/// ```
///
/// [`SinkRedirectBuilder::start()`]: crate::SinkRedirectBuilder::start
pub struct Session {
    state: Arc<SessionState>,
    listener: EventListener,
    reassigner: ReassignerHandle,
    sink: SinkInfo,
}

impl Session {
    /// Creates a new session from its started parts.
    pub(crate) fn new(
        state: Arc<SessionState>,
        listener: EventListener,
        reassigner: ReassignerHandle,
        sink: SinkInfo,
    ) -> Self {
        Self {
            state,
            listener,
            reassigner,
            sink,
        }
    }

    /// Returns the resolved target sink.
    pub fn sink(&self) -> &SinkInfo {
        &self.sink
    }

    /// Returns `true` until the listener's event loop has ended.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Returns current session statistics.
    pub fn stats(&self) -> RedirectStats {
        self.state.stats()
    }

    /// Runs the event loop on the calling thread.
    ///
    /// Under normal operation this never returns. The reassigner thread is
    /// detached: it is not joined when this returns.
    ///
    /// # Errors
    ///
    /// Returns `ListenerDisconnected` if the listener's connection is lost.
    pub fn run(self) -> Result<(), RedirectError> {
        let Self {
            listener,
            reassigner,
            ..
        } = self;

        let result = listener.listen();
        drop(reassigner);
        result
    }

    /// Runs the event loop, then waits for the reassigner to finish every
    /// queued move.
    ///
    /// Returns the listener's result along with the final statistics.
    pub fn run_and_join(self) -> (Result<(), RedirectError>, RedirectStats) {
        let Self {
            state,
            listener,
            reassigner,
            ..
        } = self;

        // The listener owns the queue producer; it is closed once listen returns
        let result = listener.listen();
        reassigner.join();

        (result, state.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_new() {
        let state = SessionState::new();
        assert!(state.running.load(Ordering::SeqCst));
        assert_eq!(state.stats(), RedirectStats::default());
    }

    #[test]
    fn test_session_state_stats_snapshot() {
        let state = SessionState::new();
        state.streams_dispatched.fetch_add(3, Ordering::SeqCst);
        state.moves_completed.fetch_add(2, Ordering::SeqCst);
        state.moves_failed.fetch_add(1, Ordering::SeqCst);

        let snapshot = state.stats();
        assert_eq!(snapshot.streams_dispatched, 3);
        assert_eq!(snapshot.moves_completed, 2);
        assert_eq!(snapshot.moves_failed, 1);
    }
}
