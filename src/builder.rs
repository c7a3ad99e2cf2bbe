//! Builder pattern for `SinkRedirect`.

use std::sync::Arc;

use crate::connect::{connect_with_retry, resolve_sink};
use crate::event::emit;
use crate::pipeline::{dispatch_queue, spawn_reassigner, EventListener, ReassignerConfig};
use crate::server::Connector;
use crate::session::{Session, SessionState};
use crate::{
    event_callback, EventCallback, RedirectConfig, RedirectError, RedirectEvent, RetryPolicy,
};

/// Entry point for redirecting new playback streams.
///
/// Use [`SinkRedirect::builder()`] to configure and start a session.
pub struct SinkRedirect;

impl SinkRedirect {
    /// Creates a new builder with the default configuration.
    pub fn builder() -> SinkRedirectBuilder {
        SinkRedirectBuilder::new()
    }
}

/// Builder for configuring and starting a redirection session.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use sink_redirect::server::{MockServer, SinkInfo};
/// use sink_redirect::{RetryPolicy, SinkRedirect};
///
/// let server = MockServer::new().with_sinks(vec![SinkInfo::new(5, "speakers")]);
///
/// let session = SinkRedirect::builder()
///     .target_sink("speakers")
///     .retry_policy(RetryPolicy::new(3, Duration::from_millis(10)))
///     .on_event(|event| println!("{event:?}"))
///     .start(Arc::new(server))
///     .unwrap();
///
/// assert_eq!(session.sink().id.index(), 5);
/// ```
#[must_use]
pub struct SinkRedirectBuilder {
    config: RedirectConfig,
    event_callback: Option<EventCallback>,
}

impl SinkRedirectBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: RedirectConfig::default(),
            event_callback: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: RedirectConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the exact name of the sink new streams are moved to.
    pub fn target_sink(mut self, name: impl Into<String>) -> Self {
        self.config.target_sink_name = name.into();
        self
    }

    /// Sets the retry policy used by both connections.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Registers a callback for runtime events.
    ///
    /// The callback runs on the listener and reassigner threads. Keep it
    /// short: it delays event handling and moves.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(RedirectEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(f));
        self
    }

    /// Connects, resolves the target sink and starts the reassigner.
    ///
    /// Startup order:
    /// 1. Open the listener connection (with retry)
    /// 2. Resolve the target sink on it
    /// 3. Spawn the reassigner, which opens its own connection (with retry)
    /// 4. Subscribe the listener to new playback streams
    ///
    /// If the sink is not found, no thread is started.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionExhausted` if either connection cannot be opened,
    /// `SinkNotFound` if no sink has the configured name, or `Server` if a
    /// startup request fails.
    pub fn start(self, connector: Arc<dyn Connector>) -> Result<Session, RedirectError> {
        let Self {
            config,
            event_callback,
        } = self;

        tracing::info!(
            backend = connector.name(),
            target = %config.target_sink_name,
            "starting sink redirect"
        );

        let mut connection = connect_with_retry(
            connector.as_ref(),
            &config.listener_client_name,
            &config.retry,
        )?;

        let sink = resolve_sink(connection.as_mut(), &config.target_sink_name)?;
        tracing::info!(sink = %sink.id, name = %sink.name, "sink found");
        emit(
            event_callback.as_ref(),
            RedirectEvent::SinkResolved { sink: sink.clone() },
        );

        let state = Arc::new(SessionState::new());
        let (producer, consumer) = dispatch_queue();

        let reassigner = spawn_reassigner(
            connector,
            ReassignerConfig {
                client_name: config.reassigner_client_name.clone(),
                retry: config.retry,
                target: sink.id,
            },
            consumer,
            Arc::clone(&state),
            event_callback.clone(),
        )?;

        let mut listener =
            EventListener::new(connection, Arc::clone(&state)).with_event_callback(event_callback);
        listener.subscribe(producer)?;

        Ok(Session::new(state, listener, reassigner, sink))
    }
}

impl Default for SinkRedirectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{MockServer, SinkInfo};
    use std::time::Duration;

    fn fast() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_millis(1))
    }

    #[test]
    fn test_builder_defaults() {
        let builder = SinkRedirect::builder();
        assert_eq!(builder.config, RedirectConfig::default());
        assert!(builder.event_callback.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let builder = SinkRedirect::builder()
            .target_sink("speakers")
            .retry_policy(fast())
            .on_event(|_| {});

        assert_eq!(builder.config.target_sink_name, "speakers");
        assert_eq!(builder.config.retry, fast());
        assert!(builder.event_callback.is_some());
    }

    #[test]
    fn test_start_opens_two_connections() {
        let server = MockServer::new().with_sinks(vec![SinkInfo::new(5, "speakers")]);

        let session = SinkRedirect::builder()
            .target_sink("speakers")
            .retry_policy(fast())
            .start(Arc::new(server.clone()))
            .unwrap();

        let config = RedirectConfig::default();
        assert_eq!(
            server.connected_clients(),
            vec![config.listener_client_name, config.reassigner_client_name]
        );
        assert_eq!(session.sink(), &SinkInfo::new(5, "speakers"));
        assert!(session.is_running());
    }

    #[test]
    fn test_start_sink_not_found() {
        let server = MockServer::new().with_sinks(vec![SinkInfo::new(5, "speakers")]);

        let result = SinkRedirect::builder()
            .target_sink("headphones")
            .retry_policy(fast())
            .start(Arc::new(server.clone()));

        assert!(matches!(result, Err(RedirectError::SinkNotFound { .. })));
        assert_eq!(server.connect_attempts(), 1);
        assert!(server.subscriptions().is_empty());
    }
}
