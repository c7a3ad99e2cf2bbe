//! Mock sound server for testing without a running server.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::{
    Connector, EventHandler, Facility, ServerConnection, ServerEvent, SinkId, SinkInfo, StreamId,
};
use crate::ServerError;

/// Something that happened on a [`MockServer`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockTrace {
    /// A connection was opened by the named client.
    Connected {
        /// Client name passed to `connect`.
        client_name: String,
    },
    /// An event was delivered to a subscribed handler.
    EventDelivered(ServerEvent),
    /// A move was attempted.
    MoveAttempted {
        /// Client name of the connection that issued the move.
        client_name: String,
        /// Stream being moved.
        stream: StreamId,
        /// Destination sink.
        sink: SinkId,
        /// Whether the mock accepted the move.
        succeeded: bool,
    },
}

#[derive(Default)]
struct MockState {
    sinks: Vec<SinkInfo>,
    connect_failures_remaining: u32,
    connect_attempts: Vec<Instant>,
    failing_moves: HashSet<StreamId>,
    events: VecDeque<ServerEvent>,
    subscriptions: Vec<Vec<Facility>>,
    trace: Vec<MockTrace>,
}

/// An in-process sound server for testing.
///
/// `MockServer` is a [`Connector`] whose connections share one scripted
/// state. It lets tests exercise connection retries, sink resolution, event
/// delivery and moves without `PulseAudio`.
///
/// Scripted events are delivered, in order, by the first connection that
/// runs its event loop, but only for facilities that connection subscribed
/// to. Once the script is exhausted the event loop returns
/// [`ServerError::Disconnected`], as if the server went away.
///
/// Cloning a `MockServer` shares its state.
///
/// # Example
///
/// ```
/// use sink_redirect::server::{Connector, MockServer, ServerConnection, SinkInfo};
///
/// let server = MockServer::new()
///     .with_sinks(vec![SinkInfo::new(5, "speakers")])
///     .fail_connects(2);
///
/// assert!(server.connect("test").is_err());
/// assert!(server.connect("test").is_err());
/// let mut connection = server.connect("test").unwrap();
/// assert_eq!(connection.list_sinks().unwrap().len(), 1);
/// assert_eq!(server.connect_attempts(), 3);
/// ```
#[derive(Clone, Default)]
pub struct MockServer {
    state: Arc<Mutex<MockState>>,
}

impl MockServer {
    /// Creates a mock server with no sinks and no scripted events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sinks returned by `list_sinks`.
    #[must_use]
    pub fn with_sinks(self, sinks: Vec<SinkInfo>) -> Self {
        self.state.lock().sinks = sinks;
        self
    }

    /// Makes the next `count` connection attempts fail.
    #[must_use]
    pub fn fail_connects(self, count: u32) -> Self {
        self.state.lock().connect_failures_remaining = count;
        self
    }

    /// Makes every move of `stream` fail.
    #[must_use]
    pub fn fail_moves_of(self, stream: StreamId) -> Self {
        self.state.lock().failing_moves.insert(stream);
        self
    }

    /// Appends an event to the script.
    #[must_use]
    pub fn with_event(self, event: ServerEvent) -> Self {
        self.state.lock().events.push_back(event);
        self
    }

    /// Appends several events to the script.
    #[must_use]
    pub fn with_events(self, events: impl IntoIterator<Item = ServerEvent>) -> Self {
        self.state.lock().events.extend(events);
        self
    }

    /// Returns how many times `connect` was called.
    pub fn connect_attempts(&self) -> usize {
        self.state.lock().connect_attempts.len()
    }

    /// Returns when each `connect` call happened.
    pub fn connect_times(&self) -> Vec<Instant> {
        self.state.lock().connect_attempts.clone()
    }

    /// Returns the client names of successfully opened connections.
    pub fn connected_clients(&self) -> Vec<String> {
        self.state
            .lock()
            .trace
            .iter()
            .filter_map(|entry| match entry {
                MockTrace::Connected { client_name } => Some(client_name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the facility lists of every successful `subscribe` call.
    pub fn subscriptions(&self) -> Vec<Vec<Facility>> {
        self.state.lock().subscriptions.clone()
    }

    /// Returns every attempted move, successful or not.
    pub fn move_attempts(&self) -> Vec<(StreamId, SinkId)> {
        self.state
            .lock()
            .trace
            .iter()
            .filter_map(|entry| match entry {
                MockTrace::MoveAttempted { stream, sink, .. } => Some((*stream, *sink)),
                _ => None,
            })
            .collect()
    }

    /// Returns the client name of the connection behind every attempted move.
    pub fn move_clients(&self) -> Vec<String> {
        self.state
            .lock()
            .trace
            .iter()
            .filter_map(|entry| match entry {
                MockTrace::MoveAttempted { client_name, .. } => Some(client_name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the moves the mock accepted.
    pub fn moves(&self) -> Vec<(StreamId, SinkId)> {
        self.state
            .lock()
            .trace
            .iter()
            .filter_map(|entry| match entry {
                MockTrace::MoveAttempted {
                    stream,
                    sink,
                    succeeded: true,
                    ..
                } => Some((*stream, *sink)),
                _ => None,
            })
            .collect()
    }

    /// Returns everything that happened, in order.
    pub fn trace(&self) -> Vec<MockTrace> {
        self.state.lock().trace.clone()
    }
}

impl Connector for MockServer {
    fn connect(&self, client_name: &str) -> Result<Box<dyn ServerConnection>, ServerError> {
        let mut state = self.state.lock();
        state.connect_attempts.push(Instant::now());

        if state.connect_failures_remaining > 0 {
            state.connect_failures_remaining -= 1;
            return Err(ServerError::connection("Connection refused"));
        }

        state.trace.push(MockTrace::Connected {
            client_name: client_name.to_string(),
        });

        Ok(Box::new(MockConnection {
            client_name: client_name.to_string(),
            state: Arc::clone(&self.state),
            handler: None,
            facilities: Vec::new(),
        }))
    }

    fn name(&self) -> &'static str {
        "Mock"
    }
}

/// A connection to a [`MockServer`].
struct MockConnection {
    client_name: String,
    state: Arc<Mutex<MockState>>,
    handler: Option<EventHandler>,
    facilities: Vec<Facility>,
}

impl MockConnection {
    /// Takes the next scripted event for a subscribed facility, dropping the
    /// ones a real server would not have delivered.
    fn next_event(&self) -> Option<ServerEvent> {
        let mut state = self.state.lock();
        while let Some(event) = state.events.pop_front() {
            if self.facilities.contains(&event.facility) {
                state.trace.push(MockTrace::EventDelivered(event));
                return Some(event);
            }
        }
        None
    }
}

impl ServerConnection for MockConnection {
    fn list_sinks(&mut self) -> Result<Vec<SinkInfo>, ServerError> {
        Ok(self.state.lock().sinks.clone())
    }

    fn move_sink_input(&mut self, stream: StreamId, sink: SinkId) -> Result<(), ServerError> {
        let mut state = self.state.lock();
        let succeeded = !state.failing_moves.contains(&stream);
        state.trace.push(MockTrace::MoveAttempted {
            client_name: self.client_name.clone(),
            stream,
            sink,
            succeeded,
        });

        if succeeded {
            Ok(())
        } else {
            Err(ServerError::operation("No such entity"))
        }
    }

    fn set_event_handler(&mut self, handler: EventHandler) {
        self.handler = Some(handler);
    }

    fn subscribe(&mut self, facilities: &[Facility]) -> Result<(), ServerError> {
        self.facilities = facilities.to_vec();
        self.state.lock().subscriptions.push(facilities.to_vec());
        Ok(())
    }

    fn run_event_loop(&mut self) -> Result<(), ServerError> {
        // The state lock is released before the handler runs
        while let Some(event) = self.next_event() {
            if let Some(handler) = self.handler.as_mut() {
                handler(event);
            }
        }

        Err(ServerError::disconnected("mock event script exhausted"))
    }
}
