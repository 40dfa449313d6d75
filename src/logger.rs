//! Logging initialisation via tracing-subscriber.
//!
//! The configured level is validated by [`parse_level`] while the config is
//! resolved, so [`init`] only ever sees a real level. `RUST_LOG`, when set,
//! replaces it with arbitrary `EnvFilter` directives.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

const LEVEL_NAMES: &str = "error, warn, info, debug, trace or off";

/// Install the global subscriber, writing to stderr.
pub fn init(level: LevelFilter) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(level, rust_log.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Non-blank `rust_log` wins; a malformed one is an error rather than a
/// silently empty filter.
fn build_filter(level: LevelFilter, rust_log: Option<&str>) -> Result<EnvFilter, AppError> {
    match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| AppError::Logger(format!("invalid RUST_LOG '{directives}': {e}"))),
        None => EnvFilter::builder()
            .with_default_directive(level.into())
            .parse("")
            .map_err(|e| AppError::Logger(e.to_string())),
    }
}

/// Parse `[relay] log_level` / `RELAY_LOG_LEVEL`.
///
/// Only plain level names are accepted. `EnvFilter` would read a typo such
/// as `verbose` as a target name and drop every relay event.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    let trimmed = level.trim();
    if trimmed.is_empty() {
        return Err(AppError::Config(format!("log_level must not be empty (expected {LEVEL_NAMES})")));
    }
    trimmed
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Config(format!("unrecognised log_level '{level}' (expected {LEVEL_NAMES})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_levels_parse() {
        assert_eq!(parse_level("info").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level(" debug ").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::OFF);
        for l in ["error", "warn", "trace"] {
            assert!(parse_level(l).is_ok(), "expected '{l}' to be valid");
        }
    }

    #[test]
    fn invalid_level_is_config_error() {
        for l in ["verbose", "", "  ", "INFO_LEVEL", "relay_bot=debug"] {
            match parse_level(l) {
                Err(AppError::Config(msg)) => assert!(msg.contains("expected error, warn")),
                other => panic!("expected config error for '{l}', got {other:?}"),
            }
        }
    }

    #[test]
    fn configured_level_applies_without_rust_log() {
        let filter = build_filter(LevelFilter::WARN, None).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = build_filter(LevelFilter::DEBUG, Some("   ")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn rust_log_overrides_configured_level() {
        let filter = build_filter(LevelFilter::INFO, Some("trace")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn malformed_rust_log_is_logger_error() {
        assert!(matches!(
            build_filter(LevelFilter::INFO, Some("relay_bot=loud")),
            Err(AppError::Logger(msg)) if msg.contains("RUST_LOG")
        ));
    }

    #[test]
    fn init_succeeds_or_already_init() {
        // Another test in this binary may have installed a subscriber first.
        match init(LevelFilter::INFO) {
            Ok(()) => {}
            Err(AppError::Logger(msg)) if msg.contains("set subscriber") => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
