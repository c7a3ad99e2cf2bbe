//! Error types for sink-redirect.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`RedirectError`]): Abort startup, or end the session when
//!   the listener connection is lost
//! - **Server errors** ([`ServerError`]): Failures reported by the sound server
//!   for a single connection attempt or operation. A failed move is logged and
//!   the session keeps running.

/// Fatal errors that prevent redirection from starting or continuing.
///
/// These are returned from [`SinkRedirectBuilder::start()`] and
/// [`Session::run()`]. Per-stream move failures never surface here; they are
/// reported through the event callback instead.
///
/// [`SinkRedirectBuilder::start()`]: crate::SinkRedirectBuilder::start
/// [`Session::run()`]: crate::Session::run
#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    /// Every connection attempt failed.
    #[error("could not connect after {attempts} attempts: {last_error}")]
    ConnectionExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error returned by the final attempt.
        #[source]
        last_error: ServerError,
    },

    /// No sink with the configured name exists on the server.
    #[error("no sink found: {name}")]
    SinkNotFound {
        /// Name that was searched for.
        name: String,
    },

    /// No sound server backend was compiled in.
    #[error("sound server backend unavailable: {reason}")]
    BackendUnavailable {
        /// Why no backend is available.
        reason: String,
    },

    /// The reassigner thread could not be spawned.
    #[error("failed to spawn reassigner thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The reassigner thread exited before reporting that it was ready.
    #[error("reassigner exited during startup")]
    ReassignerStartup,

    /// The event listener's connection was lost after startup.
    #[error("event listener connection lost: {reason}")]
    ListenerDisconnected {
        /// The error reported by the event loop.
        #[source]
        reason: ServerError,
    },

    /// A sound server request failed during startup.
    #[error("sound server error: {0}")]
    Server(#[from] ServerError),
}

/// Errors reported by a [`ServerConnection`](crate::server::ServerConnection).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServerError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// An established connection went away.
    #[error("connection lost: {0}")]
    Disconnected(String),

    /// The server rejected or failed a request.
    #[error("operation failed: {0}")]
    Operation(String),
}

impl ServerError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a disconnection error with the given message.
    pub fn disconnected(msg: impl Into<String>) -> Self {
        Self::Disconnected(msg.into())
    }

    /// Creates an operation error with the given message.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }
}
