//! Server notifications delivered to a subscribed connection.

/// The kind of object a server notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facility {
    /// An output device.
    Sink,
    /// An input device.
    Source,
    /// A playback stream.
    SinkInput,
    /// A recording stream.
    SourceOutput,
    /// A loaded server module.
    Module,
    /// A connected client.
    Client,
    /// A sample cache entry.
    SampleCache,
    /// Global server state.
    Server,
    /// A sound card.
    Card,
}

/// What happened to the object a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The object was created.
    New,
    /// A property of the object changed (volume, port, ...).
    Change,
    /// The object was removed.
    Remove,
}

/// A single lifecycle notification from the sound server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerEvent {
    /// The kind of object affected.
    pub facility: Facility,
    /// What happened to it.
    pub kind: EventKind,
    /// Server index of the affected object.
    pub index: u32,
}

impl ServerEvent {
    /// Creates a new event.
    pub const fn new(facility: Facility, kind: EventKind, index: u32) -> Self {
        Self {
            facility,
            kind,
            index,
        }
    }

    /// Returns `true` if this event announces a newly created playback stream.
    pub fn is_new_playback_stream(&self) -> bool {
        self.kind == EventKind::New && self.facility == Facility::SinkInput
    }
}

/// Handler invoked for each notification on the connection's own thread.
///
/// Handlers run inside the server's notification path: they must not block
/// and must not issue requests on the connection that delivered the event.
pub type EventHandler = Box<dyn FnMut(ServerEvent)>;

/// Creates an [`EventHandler`] from a closure.
pub fn event_handler<F>(f: F) -> EventHandler
where
    F: FnMut(ServerEvent) + 'static,
{
    Box::new(f)
}
