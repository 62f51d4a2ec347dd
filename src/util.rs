use std::time::Duration;

use tracing::level_filters::LevelFilter;

const SENTINEL_LOG_FILE: &str = "SENTINEL_LOG_FILE";

const DEFAULT_LOG_FILE: &str = "sentinel_errors.log";

pub fn get_default_log_file() -> String {
    let file_from_env = std::env::var(SENTINEL_LOG_FILE);
    file_from_env.unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string())
}

const SENTINEL_LOG_LEVEL: &str = "SENTINEL_LOG_LEVEL";

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

pub fn get_log_level() -> LevelFilter {
    let level_from_env = std::env::var(SENTINEL_LOG_LEVEL);
    level_from_env.map_or(DEFAULT_LOG_LEVEL, |res| {
        res.parse().unwrap_or(DEFAULT_LOG_LEVEL)
    })
}

/// Seconds with millisecond precision.
pub fn round_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}
