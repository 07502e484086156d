//! utitlity module
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[cfg(test)]
pub mod test_server;

/// Install the global subscriber for the command line.
///
/// `RUST_LOG` overrides `level` when set.
pub fn logger_init(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy(); // respects RUST_LOG if user set it

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(true) // colors in terminal
                .with_target(false) // cleaner output
                .with_file(false)
                .with_line_number(false)
                .compact(),
        ) // one-line format, perfect for CLIs
        .init();
}

///Intialize a logger for my tests.
/// Safe to call from every test, only the first call installs the subscriber.
/// # Arguements:
/// * level :This is the log level.
#[cfg(test)]
pub fn test_logger_init(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer().compact())
        .try_init();
}
