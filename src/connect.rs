//! Startup connection with bounded retry, and target sink resolution.

use std::thread;

use crate::server::{Connector, ServerConnection, SinkInfo};
use crate::{RedirectError, RetryPolicy, ServerError};

/// Opens a connection, retrying with a fixed backoff.
///
/// Makes at most `policy.attempts()` attempts and sleeps `policy.backoff`
/// between consecutive failures. No sleep follows the final attempt.
///
/// # Errors
///
/// Returns `ConnectionExhausted` carrying the last attempt's error when every
/// attempt fails.
pub fn connect_with_retry(
    connector: &dyn Connector,
    client_name: &str,
    policy: &RetryPolicy,
) -> Result<Box<dyn ServerConnection>, RedirectError> {
    let attempts = policy.attempts();
    let mut last_error = ServerError::connection("no connection attempt made");

    for attempt in 1..=attempts {
        match connector.connect(client_name) {
            Ok(connection) => {
                if attempt > 1 {
                    tracing::info!(
                        client = client_name,
                        attempt,
                        "connected to {} after retrying",
                        connector.name()
                    );
                }
                return Ok(connection);
            }
            Err(e) => {
                tracing::warn!(
                    client = client_name,
                    "connection attempt {}/{} to {} failed: {}",
                    attempt,
                    attempts,
                    connector.name(),
                    e
                );
                last_error = e;

                if attempt < attempts {
                    thread::sleep(policy.backoff);
                }
            }
        }
    }

    Err(RedirectError::ConnectionExhausted {
        attempts,
        last_error,
    })
}

/// Finds the sink whose name is exactly `name`.
///
/// Matching is case-sensitive with no substring or pattern matching. If
/// several sinks share the name, the first one listed wins.
///
/// # Errors
///
/// Returns `SinkNotFound` if no sink matches, or `Server` if the sink list
/// cannot be retrieved.
pub fn resolve_sink(
    connection: &mut dyn ServerConnection,
    name: &str,
) -> Result<SinkInfo, RedirectError> {
    let sinks = connection.list_sinks()?;
    tracing::debug!(count = sinks.len(), "listed sinks");

    sinks
        .into_iter()
        .find(|sink| sink.name == name)
        .ok_or_else(|| RedirectError::SinkNotFound {
            name: name.to_string(),
        })
}
