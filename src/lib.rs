//! # sink-redirect
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Moves every new playback stream onto one designated output sink.
//!
//! `sink-redirect` connects to the sound server, resolves the target sink by
//! name and then watches for newly created playback streams. Each new stream
//! is moved to the target sink as soon as it appears.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sink_redirect::{create_connector, SinkRedirect};
//!
//! let connector = Arc::from(create_connector()?);
//!
//! let session = SinkRedirect::builder()
//!     .target_sink("alsa_output.pci-0000_00_1f.3.analog-stereo")
//!     .on_event(|e| tracing::debug!(?e, "redirect event"))
//!     .start(connector)?;
//!
//! // Blocks for as long as the server connection lives
//! session.run()?;
//! ```
//!
//! ## Architecture
//!
//! The crate keeps two connections on two threads:
//!
//! - **Listener**: subscribed to stream notifications. Its handler only
//!   pushes the new stream's id onto the dispatch queue.
//! - **Dispatch queue**: unbounded FIFO between the two threads.
//! - **Reassigner**: pops ids and issues the move requests on its own
//!   connection.
//!
//! Move requests are never issued from inside the notification handler, so
//! a slow move cannot stall event delivery.

#![warn(missing_docs)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod builder;
mod config;
mod connect;
mod error;
mod event;
pub mod pipeline;
pub mod server;
mod session;

pub use builder::{SinkRedirect, SinkRedirectBuilder};
pub use config::{
    RedirectConfig, RetryPolicy, DEFAULT_LISTENER_CLIENT, DEFAULT_REASSIGNER_CLIENT,
    DEFAULT_TARGET_SINK,
};
pub use connect::{connect_with_retry, resolve_sink};
pub use error::{RedirectError, ServerError};
pub use event::{event_callback, EventCallback, RedirectEvent};
pub use server::{
    create_connector, Connector, MockServer, ServerConnection, SinkId, SinkInfo, StreamId,
};
pub use session::{RedirectStats, Session};
