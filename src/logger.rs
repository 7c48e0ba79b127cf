//! Logging setup: `tracing-subscriber` formatting to stderr.
//!
//! stdout is reserved for the CLI's JSON output, so logs never go there.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the global subscriber. Call once, after config is loaded.
///
/// `prefer_level` is set when the level came from the command line: it then
/// beats `RUST_LOG`. Otherwise `RUST_LOG`, when set and valid, wins.
pub fn init(level: &str, prefer_level: bool) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = select_filter(level, rust_log.as_deref(), prefer_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Pick the filter directive from the configured level and `RUST_LOG`.
fn select_filter(
    level: &str,
    rust_log: Option<&str>,
    prefer_level: bool,
) -> Result<EnvFilter, AppError> {
    let from_env = || rust_log.and_then(|d| EnvFilter::try_new(d).ok());
    let from_level = || EnvFilter::try_new(level).ok();

    let picked = if prefer_level {
        from_level().or_else(from_env)
    } else {
        from_env().or_else(from_level)
    };
    picked.ok_or_else(|| AppError::Logger(format!("invalid log level '{level}'")))
}

/// Parse a plain level name (`error` … `trace`, `off`).
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
