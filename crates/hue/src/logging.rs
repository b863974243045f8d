//! Logging initialization.
//!
//! Logs go to stderr through `tracing-subscriber`, either human-readable or
//! as JSON lines. Stdout is left for results.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// `level` is the default filter directive; `RUST_LOG` overrides it when set.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` section, with CLI overrides.
pub fn init_from_config(config: &hue_core::Config, verbose: bool, json_logs: bool) {
    let level = effective_level(&config.logging.level, verbose);
    let json_format = json_logs || config.logging.format == "json";
    init(level, json_format);
}

/// `--verbose` raises the level to at least debug; it never lowers trace.
fn effective_level(configured: &str, verbose: bool) -> &str {
    match (verbose, configured) {
        (true, "trace") => "trace",
        (true, _) => "debug",
        (false, level) => level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level("info", false), "info");
        assert_eq!(effective_level("warn", true), "debug");
        assert_eq!(effective_level("trace", true), "trace");
        assert_eq!(effective_level("error", false), "error");
    }
}
