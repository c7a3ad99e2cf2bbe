//! Server-assigned identifier types.

/// Identifier of a playback stream (a `PulseAudio` "sink input").
///
/// Stream ids are assigned by the server when an application opens a
/// playback stream. They are only carried as message payloads; nothing keeps
/// a list of known streams.
///
/// # Example
///
/// ```
/// use sink_redirect::StreamId;
///
/// let stream = StreamId::new(42);
/// assert_eq!(stream.index(), 42);
/// assert_eq!(stream.to_string(), "stream #42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u32);

impl StreamId {
    /// Creates a stream id from the server's index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the server's index for this stream.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream #{}", self.0)
    }
}

impl From<u32> for StreamId {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}

/// Identifier of an output device (a `PulseAudio` "sink").
///
/// The target sink's id is resolved once at startup and cached for the
/// lifetime of the session. If the sink is removed and recreated, the server
/// hands out a new id and moves to the cached one fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u32);

impl SinkId {
    /// Creates a sink id from the server's index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the server's index for this sink.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sink #{}", self.0)
    }
}

impl From<u32> for SinkId {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}
