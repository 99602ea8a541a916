use fortum_sync::config::Config;
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.fortum.locale = "NO".to_string();
    cfg.fortum.metering_points = vec!["707057500000000001".to_string()];
    cfg.schedule.publication_time = "14:15".to_string();
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.fortum.locale, "NO");
    assert_eq!(loaded.fortum.metering_points, cfg.fortum.metering_points);
    assert_eq!(loaded.schedule.publication_time, "14:15");
    assert_eq!(loaded.logging.file, cfg.logging.file);
    assert!(loaded.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    cfg.statistics.energy_statistic_id.clear();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.statistics.cost_statistic_id = cfg.statistics.energy_statistic_id.clone();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.schedule.update_interval_minutes = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.schedule.publication_time = "3pm".to_string();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.schedule.timezone = "Europe/Atlantis".to_string();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.fortum.locale = "DK".to_string();
    let msg = cfg.validate().unwrap_err().to_string();
    assert!(msg.contains("Unsupported locale: DK"));

    cfg = Config::default();
    cfg.statistics.samples_per_hour = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.fortum.lookback_days = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn resolution_must_match_samples_per_hour() {
    let mut cfg = Config::default();
    assert_eq!(cfg.fortum.samples_per_hour(), Some(4));

    cfg.fortum.resolution = "HOUR".to_string();
    let msg = cfg.validate().unwrap_err().to_string();
    assert!(msg.contains("statistics.samples_per_hour"));
    assert!(msg.contains("HOUR delivers 1 readings per hour, not 4"));

    cfg.statistics.samples_per_hour = 1;
    assert!(cfg.validate().is_ok());

    cfg = Config::default();
    cfg.fortum.resolution = "DAY".to_string();
    let msg = cfg.validate().unwrap_err().to_string();
    assert!(msg.contains("fortum.resolution"));

    // Daily data is fine when nothing is imported
    cfg.statistics.enabled = false;
    assert!(cfg.validate().is_ok());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn from_missing_file_is_io_error() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(tmp_dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{}", err).contains("I/O error"));
}
