//! Sound server client abstraction.
//!
//! Everything the redirector needs from the sound server goes through two
//! traits:
//!
//! - [`Connector`]: opens new connections. Shared between threads.
//! - [`ServerConnection`]: one open connection. Lives on the thread that
//!   opened it.
//!
//! The `PulseAudio` backend lives behind the `pulse` feature. [`MockServer`]
//! implements both traits in-process for tests.

mod ids;
mod mock;
mod notification;
#[cfg(feature = "pulse")]
mod pulse;

pub use ids::{SinkId, StreamId};
pub use mock::{MockServer, MockTrace};
pub use notification::{event_handler, EventHandler, EventKind, Facility, ServerEvent};
#[cfg(feature = "pulse")]
pub use pulse::PulseConnector;

use crate::{RedirectError, ServerError};

/// An output device known to the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SinkInfo {
    /// Server-assigned id. Changes if the sink is recreated.
    pub id: SinkId,
    /// Stable name, e.g. `alsa_output.pci-0000_00_1f.3.analog-stereo`.
    pub name: String,
}

impl SinkInfo {
    /// Creates a sink description.
    pub fn new(id: impl Into<SinkId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One open connection to the sound server.
///
/// Connections are not required to be `Send`: client libraries usually bind
/// a connection to the thread running its main loop. Open one per thread
/// through a [`Connector`].
pub trait ServerConnection {
    /// Lists all output devices currently known to the server.
    fn list_sinks(&mut self) -> Result<Vec<SinkInfo>, ServerError>;

    /// Moves a playback stream onto a sink.
    fn move_sink_input(&mut self, stream: StreamId, sink: SinkId) -> Result<(), ServerError>;

    /// Installs the handler that receives notifications for subscribed
    /// facilities. Replaces any previous handler.
    fn set_event_handler(&mut self, handler: EventHandler);

    /// Subscribes to notifications about the given facilities only.
    fn subscribe(&mut self, facilities: &[Facility]) -> Result<(), ServerError>;

    /// Dispatches notifications to the event handler until the connection
    /// ends. Blocks the calling thread; under normal operation it never
    /// returns.
    fn run_event_loop(&mut self) -> Result<(), ServerError>;
}

/// Opens connections to a sound server.
pub trait Connector: Send + Sync {
    /// Opens a new connection, announcing `client_name` to the server.
    fn connect(&self, client_name: &str) -> Result<Box<dyn ServerConnection>, ServerError>;

    /// Backend name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Creates the connector for the compiled-in sound server backend.
///
/// # Errors
///
/// Returns `BackendUnavailable` if the crate was built without the `pulse`
/// feature.
#[allow(unreachable_code)]
pub fn create_connector() -> Result<Box<dyn Connector>, RedirectError> {
    #[cfg(feature = "pulse")]
    {
        return Ok(Box::new(PulseConnector::new()));
    }

    Err(RedirectError::BackendUnavailable {
        reason: "pulse feature not enabled - rebuild with `--features pulse`".to_string(),
    })
}
