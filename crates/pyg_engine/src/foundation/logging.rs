//! Logging utilities and structured logging support
//!
//! The engine only talks to the `log` facade. Whether a sink is installed
//! never changes engine behaviour; `init*` merely installs `env_logger`.

pub use log::{debug, info, warn, error, trace};

use log::LevelFilter;

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    let _ = env_logger::try_init();
}

/// Initialize the logging system with a default level
///
/// `RUST_LOG` still overrides the level when set. Calling this more than
/// once is harmless; only the first call installs a logger.
pub fn init_with_level(level: &str) {
    let filter = parse_level(level).unwrap_or(LevelFilter::Info);
    let _ = env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .try_init();
}

/// Parse a textual log level (`off`, `error`, `warn`, `info`, `debug`, `trace`)
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    level.trim().parse().ok()
}

/// Flush any buffered records of the installed logger
pub fn flush() {
    log::logger().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_with_level("info");
        init_with_level("trace");
        init();
        flush();
    }
}
