//! Consumption records as delivered by the provider
//!
//! A record is one fine-grained (typically 15-minute) reading of energy and,
//! when the provider has priced it, the cost of that energy.

use crate::error::{Result, SyncError};
use chrono::{DateTime, DurationRound, FixedOffset, NaiveDate, TimeDelta, TimeZone, Utc};

/// Unit of the energy series
pub const ENERGY_UNIT: &str = "kWh";

/// One immutable consumption reading
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionRecord {
    timestamp: DateTime<FixedOffset>,
    value: f64,
    unit: String,
    cost: Option<f64>,
}

impl ConsumptionRecord {
    /// Create a record, rejecting negative or non-finite amounts
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        value: f64,
        unit: impl Into<String>,
        cost: Option<f64>,
    ) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(SyncError::validation(
                "value".to_string(),
                format!("Energy must be a non-negative number, got {}", value),
            ));
        }
        if let Some(c) = cost
            && !c.is_finite()
        {
            return Err(SyncError::validation(
                "cost".to_string(),
                format!("Cost must be a finite number, got {}", c),
            ));
        }
        Ok(Self {
            timestamp,
            value,
            unit: unit.into(),
            cost,
        })
    }

    /// Start of the reading interval
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Energy consumed in the interval
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Unit of [`Self::value`]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Cost of the interval, if priced
    pub fn cost(&self) -> Option<f64> {
        self.cost
    }

    /// Start of the clock hour containing this reading.
    ///
    /// Truncation happens in the record's own offset so half-hour offsets
    /// bucket by local hours.
    pub fn hour_start(&self) -> Result<DateTime<Utc>> {
        self.timestamp
            .duration_trunc(TimeDelta::hours(1))
            .map(|hour| hour.with_timezone(&Utc))
            .map_err(|e| {
                SyncError::validation(
                    "timestamp".to_string(),
                    format!("Cannot truncate {} to the hour: {}", self.timestamp, e),
                )
            })
    }

    /// Calendar date of the reading in the given time zone
    pub fn local_date<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.timestamp.with_timezone(tz).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn rejects_negative_and_non_finite_amounts() {
        let ts = at("2024-01-15T21:00:00+02:00");
        assert!(ConsumptionRecord::new(ts, -0.1, ENERGY_UNIT, None).is_err());
        assert!(ConsumptionRecord::new(ts, f64::NAN, ENERGY_UNIT, None).is_err());
        assert!(ConsumptionRecord::new(ts, 0.1, ENERGY_UNIT, Some(f64::INFINITY)).is_err());
        assert!(ConsumptionRecord::new(ts, 0.0, ENERGY_UNIT, Some(-0.05)).is_ok());
    }

    #[test]
    fn hour_start_truncates_in_local_offset() {
        let record =
            ConsumptionRecord::new(at("2024-01-15T21:45:00+02:00"), 0.45, ENERGY_UNIT, None)
                .unwrap();
        assert_eq!(
            record.hour_start().unwrap(),
            at("2024-01-15T19:00:00Z").with_timezone(&Utc)
        );

        let india =
            ConsumptionRecord::new(at("2024-01-15T10:50:00+05:30"), 0.1, ENERGY_UNIT, None)
                .unwrap();
        assert_eq!(
            india.hour_start().unwrap(),
            at("2024-01-15T10:00:00+05:30").with_timezone(&Utc)
        );
    }

    #[test]
    fn local_date_follows_time_zone() {
        let record =
            ConsumptionRecord::new(at("2024-01-15T23:30:00Z"), 0.3, ENERGY_UNIT, None).unwrap();
        assert_eq!(
            record.local_date(&chrono_tz::Europe::Helsinki),
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()
        );
        assert_eq!(
            record.local_date(&Utc),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }
}
