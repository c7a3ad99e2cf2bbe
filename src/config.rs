//! Configuration types for stream redirection.

use std::time::Duration;

/// Name of the sink that new playback streams are moved to by default.
pub const DEFAULT_TARGET_SINK: &str = "alsa_output.pci-0000_25_00.0.analog-stereo";

/// Client name used by the event listener's connection.
pub const DEFAULT_LISTENER_CLIENT: &str = "sink-redirect-listener";

/// Client name used by the reassigner's connection.
pub const DEFAULT_REASSIGNER_CLIENT: &str = "sink-redirect-reassigner";

/// How connection attempts are retried at startup.
///
/// Backoff is fixed: the same delay is used between every pair of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of connection attempts, including the first.
    ///
    /// A value of zero is treated as one.
    /// Default: 5
    pub max_attempts: u32,

    /// Delay between a failed attempt and the next one.
    ///
    /// Default: 1s
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt count and fixed backoff.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Returns the number of attempts that will actually be made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Configuration for a redirection session.
///
/// Use [`RedirectConfig::default()`] for the compiled-in target sink, or
/// customize as needed.
///
/// # Example
///
/// ```
/// use sink_redirect::{RedirectConfig, RetryPolicy};
/// use std::time::Duration;
///
/// let config = RedirectConfig {
///     target_sink_name: "alsa_output.usb-headset.analog-stereo".to_string(),
///     retry: RetryPolicy::new(10, Duration::from_millis(500)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectConfig {
    /// Exact, case-sensitive name of the sink new streams are moved to.
    pub target_sink_name: String,

    /// Retry policy shared by both connections.
    pub retry: RetryPolicy,

    /// Client name announced by the event listener's connection.
    pub listener_client_name: String,

    /// Client name announced by the reassigner's connection.
    pub reassigner_client_name: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            target_sink_name: DEFAULT_TARGET_SINK.to_string(),
            retry: RetryPolicy::default(),
            listener_client_name: DEFAULT_LISTENER_CLIENT.to_string(),
            reassigner_client_name: DEFAULT_REASSIGNER_CLIENT.to_string(),
        }
    }
}
