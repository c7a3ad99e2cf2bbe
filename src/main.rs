//! Moves every new playback stream onto the configured sink.
//!
//! Set `RUST_LOG` to change verbosity (default `info`).

use std::process::ExitCode;
use std::sync::Arc;

use sink_redirect::{create_connector, RedirectConfig, RedirectError, SinkRedirect};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), RedirectError> {
    let connector = Arc::from(create_connector()?);

    let session = SinkRedirect::builder()
        .config(RedirectConfig::default())
        .start(connector)?;

    session.run()
}
