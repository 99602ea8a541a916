use super::*;

impl Default for FortumConfig {
    fn default() -> Self {
        Self {
            locale: "FI".to_string(),
            session_token: String::new(),
            metering_points: Vec::new(),
            resolution: "FIFTEEN_MINUTE".to_string(),
            lookback_days: 2,
            request_timeout_secs: 30,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            publication_time: "15:00".to_string(),
            update_interval_minutes: 30,
            timezone: "Europe/Helsinki".to_string(),
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: "fortum".to_string(),
            energy_statistic_id: "fortum:energy_consumption".to_string(),
            cost_statistic_id: "fortum:energy_cost".to_string(),
            energy_name: "Energy Consumption".to_string(),
            cost_name: "Total Cost".to_string(),
            samples_per_hour: 4,
            gate_cost_series: true,
            store_path: "/data/fortum_statistics.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/fortum-sync.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fortum: FortumConfig::default(),
            schedule: ScheduleConfig::default(),
            statistics: StatisticsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
