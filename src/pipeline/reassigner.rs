//! Reassigner: moves queued streams onto the target sink from its own
//! thread and connection.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::oneshot;

use crate::connect::connect_with_retry;
use crate::event::{emit, EventCallback};
use crate::pipeline::DispatchConsumer;
use crate::server::{Connector, ServerConnection, SinkId, StreamId};
use crate::session::SessionState;
use crate::{RedirectError, RedirectEvent, RetryPolicy};

/// Name of the reassigner thread.
const THREAD_NAME: &str = "sink-reassigner";

/// Moves each popped stream onto the target sink.
pub struct Reassigner {
    connection: Box<dyn ServerConnection>,
    target: SinkId,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
}

impl Reassigner {
    /// Creates a reassigner on an open connection.
    pub(crate) fn new(
        connection: Box<dyn ServerConnection>,
        target: SinkId,
        state: Arc<SessionState>,
    ) -> Self {
        Self {
            connection,
            target,
            state,
            event_callback: None,
        }
    }

    /// Sets the event callback.
    pub(crate) fn with_event_callback(mut self, callback: Option<EventCallback>) -> Self {
        self.event_callback = callback;
        self
    }

    /// Moves one stream. Failures are logged and counted, never returned.
    fn reassign(&mut self, stream: StreamId) {
        match self.connection.move_sink_input(stream, self.target) {
            Ok(()) => {
                self.state.moves_completed.fetch_add(1, Ordering::SeqCst);
                tracing::info!(%stream, sink = %self.target, "moved stream");
                emit(
                    self.event_callback.as_ref(),
                    RedirectEvent::StreamMoved {
                        stream,
                        sink: self.target,
                    },
                );
            }
            Err(e) => {
                self.state.moves_failed.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(%stream, sink = %self.target, "failed to move stream: {}", e);
                emit(
                    self.event_callback.as_ref(),
                    RedirectEvent::MoveFailed {
                        stream,
                        sink: self.target,
                        error: e.to_string(),
                    },
                );
            }
        }
    }

    /// Pops and moves streams until the queue is closed.
    ///
    /// Every popped item is acknowledged, whether the move succeeded or not.
    pub fn run(mut self, mut queue: DispatchConsumer<StreamId>) {
        while let Some(stream) = queue.pop() {
            self.reassign(stream);
            queue.ack();
        }

        tracing::debug!("dispatch queue closed, reassigner stopping");
    }
}

/// Settings for [`spawn_reassigner`].
#[derive(Debug, Clone)]
pub struct ReassignerConfig {
    /// Client name announced by the reassigner's connection.
    pub client_name: String,
    /// Retry policy for opening the connection.
    pub retry: RetryPolicy,
    /// Sink every stream is moved to.
    pub target: SinkId,
}

/// Handle to the running reassigner thread.
///
/// Dropping the handle detaches the thread; it keeps running until the
/// queue closes or the process exits.
pub struct ReassignerHandle {
    handle: JoinHandle<()>,
}

impl ReassignerHandle {
    /// Waits for the thread to stop. It stops once the producer side of the
    /// queue is dropped and every queued stream has been handled.
    pub fn join(self) {
        if self.handle.join().is_err() {
            tracing::error!("reassigner thread panicked");
        }
    }
}

/// Starts the reassigner on a dedicated thread.
///
/// The thread opens its own connection with `config.retry` before taking
/// anything from the queue. This function blocks until that connection is
/// open, so a reassigner that cannot connect fails startup.
///
/// # Errors
///
/// Returns `ConnectionExhausted` if the reassigner could not connect, or
/// `Spawn` if the thread could not be created.
pub(crate) fn spawn_reassigner(
    connector: Arc<dyn Connector>,
    config: ReassignerConfig,
    queue: DispatchConsumer<StreamId>,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
) -> Result<ReassignerHandle, RedirectError> {
    let (ready_tx, ready_rx) = oneshot::channel();

    let handle = thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            let connection =
                match connect_with_retry(connector.as_ref(), &config.client_name, &config.retry) {
                    Ok(connection) => connection,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
            let _ = ready_tx.send(Ok(()));

            Reassigner::new(connection, config.target, state)
                .with_event_callback(event_callback)
                .run(queue);
        })
        .map_err(RedirectError::Spawn)?;

    match ready_rx.blocking_recv() {
        Ok(Ok(())) => Ok(ReassignerHandle { handle }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(RedirectError::ReassignerStartup),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::dispatch_queue;
    use crate::server::MockServer;
    use std::time::Duration;

    fn ids(raw: &[u32]) -> Vec<(StreamId, SinkId)> {
        raw.iter()
            .map(|&id| (StreamId::new(id), SinkId::new(5)))
            .collect()
    }

    #[test]
    fn test_reassigner_moves_in_order() {
        let server = MockServer::new();
        let connection = server.connect("reassigner").unwrap();
        let state = Arc::new(SessionState::new());
        let (producer, consumer) = dispatch_queue();

        for id in [1, 2, 3] {
            producer.push(StreamId::new(id)).unwrap();
        }
        drop(producer);

        Reassigner::new(connection, SinkId::new(5), state.clone()).run(consumer);

        assert_eq!(server.moves(), ids(&[1, 2, 3]));
        assert_eq!(state.moves_completed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_reassigner_survives_failed_move() {
        let server = MockServer::new().fail_moves_of(StreamId::new(2));
        let connection = server.connect("reassigner").unwrap();
        let state = Arc::new(SessionState::new());
        let (producer, consumer) = dispatch_queue();

        for id in [1, 2, 3] {
            producer.push(StreamId::new(id)).unwrap();
        }
        drop(producer);

        Reassigner::new(connection, SinkId::new(5), state.clone()).run(consumer);

        assert_eq!(server.move_attempts(), ids(&[1, 2, 3]));
        assert_eq!(server.moves(), ids(&[1, 3]));
        assert_eq!(state.moves_completed.load(Ordering::SeqCst), 2);
        assert_eq!(state.moves_failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reassigner_acks_every_item() {
        let server = MockServer::new().fail_moves_of(StreamId::new(2));
        let (producer, consumer) = dispatch_queue();
        let config = ReassignerConfig {
            client_name: "reassigner".to_string(),
            retry: RetryPolicy::new(1, Duration::ZERO),
            target: SinkId::new(5),
        };

        let handle = spawn_reassigner(
            Arc::new(server.clone()),
            config,
            consumer,
            Arc::new(SessionState::new()),
            None,
        )
        .unwrap();

        for id in [1, 2, 3] {
            producer.push(StreamId::new(id)).unwrap();
        }
        assert!(producer.wait_drained_timeout(Duration::from_secs(5)));
        assert_eq!(server.move_attempts().len(), 3);

        drop(producer);
        handle.join();
    }

    #[test]
    fn test_spawn_reassigner_connect_failure_is_fatal() {
        let server = MockServer::new().fail_connects(2);
        let (_producer, consumer) = dispatch_queue();
        let config = ReassignerConfig {
            client_name: "reassigner".to_string(),
            retry: RetryPolicy::new(2, Duration::from_millis(1)),
            target: SinkId::new(5),
        };

        let result = spawn_reassigner(
            Arc::new(server.clone()),
            config,
            consumer,
            Arc::new(SessionState::new()),
            None,
        );

        assert!(matches!(
            result,
            Err(RedirectError::ConnectionExhausted { attempts: 2, .. })
        ));
        assert_eq!(server.connect_attempts(), 2);
    }

    #[test]
    fn test_spawned_reassigner_stops_when_queue_closes() {
        let server = MockServer::new();
        let (producer, consumer) = dispatch_queue();
        let config = ReassignerConfig {
            client_name: "reassigner".to_string(),
            retry: RetryPolicy::default(),
            target: SinkId::new(5),
        };

        let handle = spawn_reassigner(
            Arc::new(server.clone()),
            config,
            consumer,
            Arc::new(SessionState::new()),
            None,
        )
        .unwrap();

        producer.push(StreamId::new(9)).unwrap();
        drop(producer);
        handle.join();

        assert_eq!(server.moves(), ids(&[9]));
        assert_eq!(server.connected_clients(), vec!["reassigner".to_string()]);
    }
}
