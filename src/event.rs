//! Runtime events for monitoring redirection.
//!
//! Events are non-fatal notifications about what the session is doing. The
//! session continues running after events are emitted - they're for
//! logging/metrics, not error handling.

use std::sync::Arc;

use crate::server::{SinkId, SinkInfo, StreamId};

/// Runtime events emitted by a redirection session.
///
/// `SinkResolved` is emitted during startup. `StreamDispatched` comes from
/// the listener thread, `StreamMoved` and `MoveFailed` from the reassigner
/// thread.
///
/// # Example
///
/// ```
/// use sink_redirect::RedirectEvent;
///
/// fn handle_event(event: RedirectEvent) {
///     match event {
///         RedirectEvent::SinkResolved { sink } => {
///             println!("target sink {} is {}", sink.name, sink.id);
///         }
///         RedirectEvent::StreamDispatched { stream } => {
///             println!("new stream {}", stream);
///         }
///         RedirectEvent::StreamMoved { stream, sink } => {
///             println!("moved {} to {}", stream, sink);
///         }
///         RedirectEvent::MoveFailed { stream, error, .. } => {
///             eprintln!("could not move {}: {}", stream, error);
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectEvent {
    /// The target sink was found at startup.
    SinkResolved {
        /// The resolved sink.
        sink: SinkInfo,
    },

    /// A new playback stream was queued for moving.
    StreamDispatched {
        /// The stream that was queued.
        stream: StreamId,
    },

    /// A stream was moved onto the target sink.
    StreamMoved {
        /// The stream that was moved.
        stream: StreamId,
        /// The sink it now plays on.
        sink: SinkId,
    },

    /// Moving a stream failed.
    ///
    /// Usually the stream was already gone by the time the move ran, or the
    /// target sink id is no longer valid.
    MoveFailed {
        /// The stream that could not be moved.
        stream: StreamId,
        /// The sink it was being moved to.
        sink: SinkId,
        /// Description of the error.
        error: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Register one via [`SinkRedirectBuilder::on_event()`]. It is called from
/// both the listener and the reassigner thread, hence `Send + Sync`.
///
/// [`SinkRedirectBuilder::on_event()`]: crate::SinkRedirectBuilder::on_event
pub type EventCallback = Arc<dyn Fn(RedirectEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use sink_redirect::{event_callback, RedirectEvent};
///
/// let callback = event_callback(|event: RedirectEvent| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(RedirectEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Sends an event to the callback if one is registered.
pub(crate) fn emit(callback: Option<&EventCallback>, event: RedirectEvent) {
    if let Some(callback) = callback {
        callback(event);
    }
}
