// Logging module - Logging infrastructure
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::io;

/// Filter directive for the given `-v` count, falling back to the configured level
pub fn filter_directive(log_level: &str, verbosity: u8) -> String {
    match verbosity {
        0 => format!("mavshell={},warn", log_level),
        1 => "mavshell=debug,warn".to_string(),
        _ => "mavshell=trace,info".to_string(),
    }
}

/// Initialize logging system.
///
/// Logs go to stderr so they never mix into the remote shell's output on stdout.
/// `RUST_LOG` takes precedence over both the config file and `-v`.
pub fn init_logging(log_level: &str, verbosity: u8) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level, verbosity)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_file(verbosity > 1)
                .with_line_number(verbosity > 1)
        )
        .try_init()?;

    tracing::debug!("MavShell logging system initialized");
    Ok(())
}
