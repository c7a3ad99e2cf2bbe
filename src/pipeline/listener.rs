//! Event listener: turns stream-creation notifications into queued moves.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::event::{emit, EventCallback};
use crate::pipeline::DispatchProducer;
use crate::server::{event_handler, Facility, ServerConnection, ServerEvent, StreamId};
use crate::session::SessionState;
use crate::{RedirectError, RedirectEvent};

/// Queues the stream announced by `event` if it is a new playback stream.
///
/// This runs inside the server's notification path, so it only pushes onto
/// the queue and never talks to the server. Returns `true` if a stream was
/// queued.
pub fn forward_event(event: &ServerEvent, queue: &DispatchProducer<StreamId>) -> bool {
    if !event.is_new_playback_stream() {
        tracing::trace!(?event, "ignoring event");
        return false;
    }

    let stream = StreamId::new(event.index);
    match queue.push(stream) {
        Ok(()) => {
            tracing::debug!(%stream, "queued new playback stream");
            true
        }
        Err(e) => {
            tracing::warn!(%stream, "dropping new playback stream: {}", e);
            false
        }
    }
}

/// Holds the long-lived, subscribed connection.
///
/// The listener's connection is separate from the reassigner's: moves are
/// never issued from inside the notification handler.
pub struct EventListener {
    connection: Box<dyn ServerConnection>,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
}

impl EventListener {
    /// Creates a listener on an open connection.
    pub(crate) fn new(connection: Box<dyn ServerConnection>, state: Arc<SessionState>) -> Self {
        Self {
            connection,
            state,
            event_callback: None,
        }
    }

    /// Sets the event callback.
    pub(crate) fn with_event_callback(mut self, callback: Option<EventCallback>) -> Self {
        self.event_callback = callback;
        self
    }

    /// Installs the notification handler and subscribes to playback stream
    /// events only.
    ///
    /// The handler takes ownership of `queue`; it is dropped together with
    /// the connection, which closes the queue for the reassigner.
    pub fn subscribe(&mut self, queue: DispatchProducer<StreamId>) -> Result<(), RedirectError> {
        let state = Arc::clone(&self.state);
        let callback = self.event_callback.clone();

        self.connection.set_event_handler(event_handler(move |event| {
            if forward_event(&event, &queue) {
                state.streams_dispatched.fetch_add(1, Ordering::SeqCst);
                emit(
                    callback.as_ref(),
                    RedirectEvent::StreamDispatched {
                        stream: StreamId::new(event.index),
                    },
                );
            }
        }));
        self.connection.subscribe(&[Facility::SinkInput])?;

        tracing::info!("listening for new playback streams");
        Ok(())
    }

    /// Dispatches notifications on the calling thread until the connection
    /// ends.
    ///
    /// Under normal operation this never returns.
    ///
    /// # Errors
    ///
    /// Returns `ListenerDisconnected` if the event loop fails. No
    /// resubscription is attempted.
    pub fn listen(mut self) -> Result<(), RedirectError> {
        let result = self.connection.run_event_loop();
        self.state.running.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                tracing::info!("event loop exited");
                Ok(())
            }
            Err(reason) => Err(RedirectError::ListenerDisconnected { reason }),
        }
    }
}
