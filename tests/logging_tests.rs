use fortum_sync::config::LoggingConfig;
use fortum_sync::logging::{LogContext, get_logger_with_context, init_logging, parse_log_level};
use tracing::Level;

#[test]
fn parse_accepts_warning_alias() {
    assert_eq!(parse_log_level("warning").unwrap(), Level::WARN);
    assert_eq!(parse_log_level(" trace ").unwrap(), Level::TRACE);
    assert!(parse_log_level("verbose").is_err());
}

#[test]
fn init_logging_writes_into_log_directory() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let config = LoggingConfig {
        level: "DEBUG".to_string(),
        file: tmp_dir
            .path()
            .join("fortum-sync.log")
            .to_string_lossy()
            .to_string(),
        console_output: false,
        ..LoggingConfig::default()
    };
    assert!(init_logging(&config).is_ok());
    // Later calls are no-ops
    assert!(init_logging(&config).is_ok());

    let logger = get_logger_with_context(
        LogContext::new("statistics").with_statistic_id("fortum:energy_cost"),
    );
    logger.info("logging initialised");
}
