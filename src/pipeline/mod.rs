//! Stream redirection pipeline.
//!
//! Two connections, two threads, one queue between them:
//!
//! ```text
//! Server events → Event Listener (main thread) → Dispatch Queue → Reassigner (own thread) → move
//! ```
//!
//! - **Event Listener**: Subscribed connection; its handler only queues new
//!   playback streams
//! - **Dispatch Queue**: Unbounded FIFO with acknowledgements
//! - **Reassigner**: Second connection that issues the moves
//!
//! The queue keeps blocking requests out of the notification callback.

mod listener;
mod queue;
mod reassigner;

pub use listener::forward_event;
pub(crate) use listener::EventListener;
pub use queue::{dispatch_queue, DispatchConsumer, DispatchProducer, QueueClosed};
pub(crate) use reassigner::{spawn_reassigner, ReassignerConfig, ReassignerHandle};
