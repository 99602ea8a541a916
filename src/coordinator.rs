//! Publication-aware polling coordinator
//!
//! The provider publishes yesterday's consumption some time in the afternoon.
//! Before that threshold polling is pointless; after it the coordinator polls
//! on every tick until a fetch contains yesterday's records, and then stays
//! quiet until the threshold of the next day.

use crate::config::ScheduleConfig;
use crate::error::{FetchFailureKind, Result, SyncError};
use crate::fortum::ConsumptionSource;
use crate::logging::{StructuredLogger, get_logger};
use crate::model::ConsumptionRecord;
use crate::statistics::StatisticsImporter;
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;

/// Anything driven by a periodic tick that exposes its latest value
#[async_trait::async_trait]
pub trait PollingTask: Send {
    type Value: Clone + Send + Sync;

    /// Run one polling cycle
    async fn tick(&mut self) -> Result<Self::Value>;

    /// Value produced by the most recent successful or skipped tick
    fn current_value(&self) -> Option<Self::Value>;
}

/// Memory of the daily fetch cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerState {
    /// Last tick whose fetch contained yesterday's data
    pub last_successful_fetch: Option<DateTime<Tz>>,
    /// Past the threshold and still polling for yesterday's data
    pub waiting_for_data: bool,
}

/// When data becomes available and how often to poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublicationSchedule {
    publication_time: NaiveTime,
    timezone: Tz,
    update_interval: Duration,
}

impl PublicationSchedule {
    pub fn new(publication_time: NaiveTime, timezone: Tz, update_interval: Duration) -> Self {
        Self {
            publication_time,
            timezone,
            update_interval,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Ok(Self::new(
            config.publication_time()?,
            config.timezone()?,
            config.update_interval(),
        ))
    }

    pub fn publication_time(&self) -> NaiveTime {
        self.publication_time
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Local wall-clock threshold on the day of `now`
    pub fn threshold_on(&self, now: &DateTime<Tz>) -> NaiveDateTime {
        now.date_naive().and_time(self.publication_time)
    }
}

/// Coordinates fetches, statistics import and the cached data set
pub struct Coordinator {
    source: Box<dyn ConsumptionSource>,
    importer: Option<StatisticsImporter>,
    schedule: PublicationSchedule,
    currency: String,
    state: SchedulerState,
    data: Option<Arc<Vec<ConsumptionRecord>>>,
    last_update_success: bool,
    last_error: Option<String>,
    logger: StructuredLogger,
}

impl Coordinator {
    pub fn new(
        source: Box<dyn ConsumptionSource>,
        schedule: PublicationSchedule,
        currency: &str,
    ) -> Self {
        Self {
            source,
            importer: None,
            schedule,
            currency: currency.to_string(),
            state: SchedulerState::default(),
            data: None,
            last_update_success: true,
            last_error: None,
            logger: get_logger("coordinator"),
        }
    }

    /// Import statistics after each successful fetch
    pub fn with_importer(mut self, importer: StatisticsImporter) -> Self {
        self.importer = Some(importer);
        self
    }

    /// Resume from a previously captured state
    pub fn with_state(mut self, state: SchedulerState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn schedule(&self) -> &PublicationSchedule {
        &self.schedule
    }

    pub fn data(&self) -> Option<&Arc<Vec<ConsumptionRecord>>> {
        self.data.as_ref()
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Current time in the schedule's zone
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.schedule.timezone)
    }

    /// Decide whether this tick should hit the provider.
    ///
    /// Comparisons use local wall-clock time so the threshold keeps its
    /// meaning across DST changes. A positive answer marks the coordinator as
    /// waiting for data.
    pub fn should_fetch_now(&mut self, now: &DateTime<Tz>) -> bool {
        let now = now.with_timezone(&self.schedule.timezone);
        let threshold = self.schedule.threshold_on(&now);

        if now.naive_local() < threshold {
            self.logger.debug(&format!(
                "Before publication time {}, not fetching",
                self.schedule.publication_time.format("%H:%M")
            ));
            return false;
        }

        if let Some(last) = &self.state.last_successful_fetch {
            let last = last.with_timezone(&self.schedule.timezone);
            if last.date_naive() == now.date_naive() && last.naive_local() >= threshold {
                self.logger
                    .debug("Already fetched yesterday's data today, not fetching");
                return false;
            }
        }

        self.state.waiting_for_data = true;
        true
    }

    /// Whether any record falls on the calendar day before `now`
    pub fn has_previous_day_data(&self, records: &[ConsumptionRecord], now: &DateTime<Tz>) -> bool {
        let tz = self.schedule.timezone;
        let Some(yesterday) = now.with_timezone(&tz).date_naive().pred_opt() else {
            return false;
        };
        let count = records
            .iter()
            .filter(|r| r.local_date(&tz) == yesterday)
            .count();
        self.logger.debug(&format!(
            "Found {} record(s) for {}",
            count,
            yesterday.format("%Y-%m-%d")
        ));
        count > 0
    }

    /// Run one cycle as if the clock read `now`
    pub async fn tick_at<Z: TimeZone>(
        &mut self,
        now: DateTime<Z>,
    ) -> Result<Arc<Vec<ConsumptionRecord>>> {
        let now = now.with_timezone(&self.schedule.timezone);
        self.logger.trace(&format!("Tick at {}", now));

        if !self.should_fetch_now(&now) {
            let data = self
                .data
                .get_or_insert_with(|| Arc::new(Vec::new()))
                .clone();
            return Ok(data);
        }

        self.logger.debug("Fetching consumption data");
        let records = match self.source.fetch_consumption().await {
            Ok(records) => records.unwrap_or_default(),
            Err(err) => return Err(self.record_failure(err)),
        };
        self.logger
            .debug(&format!("Fetched {} record(s)", records.len()));

        if !records.is_empty()
            && let Some(importer) = &self.importer
        {
            if let Err(e) = importer.import(&records, &self.currency).await {
                self.logger.error(&format!(
                    "Failed to import statistics: {}. Sensor values are unaffected",
                    e
                ));
            }
        }

        if self.has_previous_day_data(&records, &now) {
            self.state.last_successful_fetch = Some(now);
            self.state.waiting_for_data = false;
            self.logger.info(&format!(
                "Fetched yesterday's data, next fetch after {} tomorrow",
                self.schedule.publication_time.format("%H:%M")
            ));
        } else if self.state.waiting_for_data {
            self.logger.debug(&format!(
                "Yesterday's data not published yet, retrying in {} minute(s)",
                self.schedule.update_interval.as_secs() / 60
            ));
        }

        let data = Arc::new(records);
        self.data = Some(data.clone());
        self.last_update_success = true;
        self.last_error = None;
        Ok(data)
    }

    fn record_failure(&mut self, err: SyncError) -> SyncError {
        let kind = err.fetch_failure_kind();
        let message = format!("{}: {}", kind.label(), err.detail());
        match kind {
            FetchFailureKind::Authentication => self.logger.warn(&format!(
                "{} during data update. Session changes can take a moment to propagate",
                message
            )),
            _ => self
                .logger
                .error(&format!("{} during data update", message)),
        }
        self.last_update_success = false;
        self.last_error = Some(message.clone());
        SyncError::update_failed(message)
    }
}

#[async_trait::async_trait]
impl PollingTask for Coordinator {
    type Value = Arc<Vec<ConsumptionRecord>>;

    async fn tick(&mut self) -> Result<Self::Value> {
        let now = self.now();
        self.tick_at(now).await
    }

    fn current_value(&self) -> Option<Self::Value> {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Helsinki;

    struct NoSource;

    #[async_trait::async_trait]
    impl ConsumptionSource for NoSource {
        async fn fetch_consumption(&self) -> Result<Option<Vec<ConsumptionRecord>>> {
            Ok(None)
        }
    }

    fn coordinator() -> Coordinator {
        let schedule = PublicationSchedule::new(
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            Helsinki,
            Duration::from_secs(1800),
        );
        Coordinator::new(Box::new(NoSource), schedule, "EUR")
    }

    fn local(h: u32, m: u32) -> DateTime<Tz> {
        Helsinki.with_ymd_and_hms(2024, 1, 16, h, m, 0).unwrap()
    }

    #[test]
    fn test_threshold_boundaries() {
        let mut c = coordinator();
        assert!(!c.should_fetch_now(&local(0, 0)));
        assert!(!c.should_fetch_now(&local(14, 59)));
        assert!(!c.state().waiting_for_data);
        assert!(c.should_fetch_now(&local(15, 0)));
        assert!(c.should_fetch_now(&local(23, 59)));
        assert!(c.state().waiting_for_data);
    }

    #[test]
    fn test_fetched_today_blocks_until_tomorrow() {
        let mut c = coordinator().with_state(SchedulerState {
            last_successful_fetch: Some(local(15, 30)),
            waiting_for_data: false,
        });
        assert!(!c.should_fetch_now(&local(18, 0)));
        let tomorrow = Helsinki.with_ymd_and_hms(2024, 1, 17, 15, 30, 0).unwrap();
        assert!(c.should_fetch_now(&tomorrow));
    }

    #[test]
    fn test_dst_day_uses_wall_clock() {
        let mut c = coordinator();
        // 2024-03-31 is 23 hours long in Helsinki
        let before = Helsinki.with_ymd_and_hms(2024, 3, 31, 14, 59, 0).unwrap();
        let after = Helsinki.with_ymd_and_hms(2024, 3, 31, 15, 0, 0).unwrap();
        assert!(!c.should_fetch_now(&before));
        assert!(c.should_fetch_now(&after));
    }

    #[tokio::test]
    async fn test_skipped_tick_without_data_yields_empty() {
        let mut c = coordinator();
        assert!(c.current_value().is_none());
        let data = c.tick_at(local(10, 0)).await.unwrap();
        assert!(data.is_empty());
        assert!(c.current_value().is_some());
    }
}
