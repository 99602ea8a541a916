//! Structured logging and tracing for fortum-sync
//!
//! Console and daily-rolling file output through the tracing ecosystem, plus a
//! small component-scoped logger used by the coordinator, importer and client.

use crate::config::LoggingConfig;
use crate::error::{Result, SyncError};
use std::path::Path;
use tracing::{Level, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod level;
mod state;
mod structured;

pub use level::{min_level, parse_log_level};
pub use structured::{LogContext, StructuredLogger, get_logger, get_logger_with_context};

/// Set to route logs to the console only, skipping the rolling file
pub const DISABLE_FILE_LOG_ENV: &str = "FORTUM_SYNC_DISABLE_FILE_LOG";

/// Initialize logging system based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    state::INIT_ONCE.call_once(|| {
        let init_result = (|| -> Result<()> {
            let base_level = parse_log_level(&config.level)?;

            let console_level = config
                .console_level
                .as_ref()
                .and_then(|s| parse_log_level(s).ok())
                .unwrap_or(base_level);
            let file_level = config
                .file_level
                .as_ref()
                .and_then(|s| parse_log_level(s).ok())
                .unwrap_or(base_level);

            // Layer filters narrow down from the most verbose level
            let filter = build_env_filter(min_level(console_level, file_level));

            if should_use_console_only() {
                init_console_only_logging(filter, config.json_format, console_level);
                return Ok(());
            }

            init_file_logging(config, filter, console_level, file_level)
        })();

        if let Err(e) = init_result {
            let _ = state::INIT_ERROR.set(e.to_string());
        }
    });

    if let Some(err) = state::INIT_ERROR.get() {
        return Err(SyncError::config(err.clone()));
    }
    Ok(())
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("fortum_sync={},reqwest=warn,hyper=warn", level).into())
}

fn should_use_console_only() -> bool {
    cfg!(test) || std::env::var_os(DISABLE_FILE_LOG_ENV).is_some()
}

fn init_console_only_logging(filter: EnvFilter, json_format: bool, console_level: Level) {
    let console_layer = {
        let base = fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false);
        if json_format {
            base.json()
                .with_filter(LevelFilter::from_level(console_level))
                .boxed()
        } else {
            base.with_filter(LevelFilter::from_level(console_level))
                .boxed()
        }
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();

    // Another subscriber (e.g. a test harness) may already be installed
    if result.is_ok() {
        info!(
            "Logging initialized - console_level: {:?}, console-only",
            console_level
        );
    }
}

fn init_file_logging(
    config: &LoggingConfig,
    filter: EnvFilter,
    console_level: Level,
    file_level: Level,
) -> Result<()> {
    let file_appender = rolling::Builder::new()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix("fortum-sync")
        .filename_suffix("log")
        .max_log_files(config.backup_count.max(1) as usize)
        .build({
            // A path with an extension names a file; its parent holds the rotations
            let p = Path::new(&config.file);
            if p.extension().is_some() {
                p.parent().unwrap_or(p)
            } else {
                p
            }
        })
        .map_err(|e| SyncError::io(format!("Failed to create log file appender: {}", e)))?;

    let (non_blocking_appender, guard) = non_blocking(file_appender);
    let _ = state::LOG_GUARD.set(guard);

    let file_layer = {
        let base = fmt::layer()
            .with_writer(non_blocking_appender)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_ansi(false);
        if config.json_format {
            base.json()
                .with_filter(LevelFilter::from_level(file_level))
                .boxed()
        } else {
            base.with_filter(LevelFilter::from_level(file_level))
                .boxed()
        }
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(file_layer);

    let result = if config.console_output {
        let console_layer = {
            let base = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false);
            if config.json_format {
                base.json()
                    .with_filter(LevelFilter::from_level(console_level))
                    .boxed()
            } else {
                base.with_filter(LevelFilter::from_level(console_level))
                    .boxed()
            }
        };
        subscriber.with(console_layer).try_init()
    } else {
        subscriber.try_init()
    };
    result.map_err(|e| SyncError::config(format!("Failed to install subscriber: {}", e)))?;

    info!(
        "Logging initialized - console_level: {:?}, file_level: {:?}, file: {}",
        console_level, file_level, config.file
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn init_test_logging() {
        INIT.call_once(|| {
            let config = LoggingConfig::default();
            init_logging(&config).ok();
        });
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("ERROR").unwrap(), Level::ERROR);
        assert!(parse_log_level("invalid").is_err());
    }

    #[test]
    fn test_min_level_picks_most_verbose() {
        assert_eq!(min_level(Level::INFO, Level::DEBUG), Level::DEBUG);
        assert_eq!(min_level(Level::WARN, Level::ERROR), Level::WARN);
    }

    #[test]
    fn test_log_context() {
        let context = LogContext::new("test")
            .with_statistic_id("fortum:energy_consumption")
            .with_field("key", "value".to_string());

        assert_eq!(context.component, "test");
        assert_eq!(
            context.statistic_id.as_deref(),
            Some("fortum:energy_consumption")
        );
        assert_eq!(context.extra_fields.get("key"), Some(&"value".to_string()));
    }

    #[test]
    fn test_structured_logger() {
        init_test_logging();

        let logger = StructuredLogger::new(LogContext::new("test_component"));

        // These should not panic
        logger.info("Test info message");
        logger.debug("Test debug message");
        logger.warn("Test warning message");
        logger.error("Test error message");
    }

    #[test]
    fn test_get_logger() {
        let logger = get_logger("test_component");
        assert_eq!(logger.context.component, "test_component");
    }
}
