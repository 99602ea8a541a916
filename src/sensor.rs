//! Display adapters over the coordinator's data set
//!
//! Sensors are read-only views: a total of the current window and a few
//! descriptive attributes. `None` as input means no tick has completed yet.

use crate::model::{ConsumptionRecord, ENERGY_UNIT};
use serde::Serialize;
use std::collections::BTreeSet;

/// Read-only projection of the latest records
pub trait Sensor {
    type Attributes: Serialize;

    fn name(&self) -> &str;

    fn unit(&self) -> &str;

    /// Headline value; `None` before the first tick, `0.0` for empty data
    fn native_value(&self, data: Option<&[ConsumptionRecord]>) -> Option<f64>;

    /// Extra attributes, only when there is data to describe
    fn attributes(&self, data: Option<&[ConsumptionRecord]>) -> Option<Self::Attributes>;
}

/// Coverage of a set of records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSpan {
    pub earliest: String,
    pub latest: String,
    pub time_range_hours: f64,
    pub resolution_minutes: Option<i64>,
}

impl TimeSpan {
    fn of(records: &[&ConsumptionRecord]) -> Option<Self> {
        let mut stamps: Vec<_> = records.iter().map(|r| r.timestamp()).collect();
        stamps.sort();
        let (first, last) = (stamps.first()?, stamps.last()?);
        let resolution_minutes = stamps.get(1).map(|second| (*second - *first).num_minutes());
        Some(Self {
            earliest: first.to_rfc3339(),
            latest: last.to_rfc3339(),
            time_range_hours: (*last - *first).num_seconds() as f64 / 3600.0,
            resolution_minutes,
        })
    }
}

fn distinct_hours(records: &[&ConsumptionRecord]) -> usize {
    records
        .iter()
        .filter_map(|r| r.hour_start().ok())
        .collect::<BTreeSet<_>>()
        .len()
}

fn per_hour(total: f64, records: &[&ConsumptionRecord]) -> Option<f64> {
    match distinct_hours(records) {
        0 => None,
        hours => Some(total / hours as f64),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyAttributes {
    pub total_records: usize,
    #[serde(flatten)]
    pub span: TimeSpan,
    pub average_per_hour: Option<f64>,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAttributes {
    pub total_records: usize,
    pub records_with_cost: usize,
    #[serde(flatten)]
    pub span: Option<TimeSpan>,
    pub average_per_hour: Option<f64>,
    pub currency: String,
    pub statistic_id: String,
}

/// Total energy in the current window
#[derive(Debug, Clone)]
pub struct EnergySensor {
    name: String,
}

impl EnergySensor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Default for EnergySensor {
    fn default() -> Self {
        Self::new("Energy Consumption")
    }
}

impl Sensor for EnergySensor {
    type Attributes = EnergyAttributes;

    fn name(&self) -> &str {
        &self.name
    }

    fn unit(&self) -> &str {
        ENERGY_UNIT
    }

    fn native_value(&self, data: Option<&[ConsumptionRecord]>) -> Option<f64> {
        data.map(|records| records.iter().map(|r| r.value()).sum())
    }

    fn attributes(&self, data: Option<&[ConsumptionRecord]>) -> Option<EnergyAttributes> {
        let records: Vec<&ConsumptionRecord> = data?.iter().collect();
        let span = TimeSpan::of(&records)?;
        let total: f64 = records.iter().map(|r| r.value()).sum();
        Some(EnergyAttributes {
            total_records: records.len(),
            span,
            average_per_hour: per_hour(total, &records),
            unit: ENERGY_UNIT.to_string(),
        })
    }
}

/// Total cost in the current window, linked to the cost statistic
#[derive(Debug, Clone)]
pub struct CostSensor {
    name: String,
    currency: String,
    statistic_id: String,
}

impl CostSensor {
    pub fn new(name: &str, currency: &str, statistic_id: &str) -> Self {
        Self {
            name: name.to_string(),
            currency: currency.to_string(),
            statistic_id: statistic_id.to_string(),
        }
    }

    pub fn statistic_id(&self) -> &str {
        &self.statistic_id
    }
}

impl Sensor for CostSensor {
    type Attributes = CostAttributes;

    fn name(&self) -> &str {
        &self.name
    }

    fn unit(&self) -> &str {
        &self.currency
    }

    fn native_value(&self, data: Option<&[ConsumptionRecord]>) -> Option<f64> {
        data.map(|records| records.iter().filter_map(|r| r.cost()).sum())
    }

    fn attributes(&self, data: Option<&[ConsumptionRecord]>) -> Option<CostAttributes> {
        let data = data?;
        if data.is_empty() {
            return None;
        }
        let priced: Vec<&ConsumptionRecord> = data.iter().filter(|r| r.cost().is_some()).collect();
        let total: f64 = priced.iter().filter_map(|r| r.cost()).sum();
        Some(CostAttributes {
            total_records: data.len(),
            records_with_cost: priced.len(),
            span: TimeSpan::of(&priced),
            average_per_hour: per_hour(total, &priced),
            currency: self.currency.clone(),
            statistic_id: self.statistic_id.clone(),
        })
    }
}

/// Two decimals followed by the unit; missing values render as zero
pub fn format_energy(value: Option<f64>, unit: &str) -> String {
    format!("{:.2} {}", value.unwrap_or(0.0), unit)
}

pub fn format_currency(value: Option<f64>, currency: &str) -> String {
    format!("{:.2} {}", value.unwrap_or(0.0), currency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_currency(Some(123.45), "SEK"), "123.45 SEK");
        assert_eq!(format_currency(Some(250.5), "NOK"), "250.50 NOK");
        assert_eq!(format_currency(None, "EUR"), "0.00 EUR");
        assert_eq!(format_currency(Some(12345678.9), "SEK"), "12345678.90 SEK");
        assert_eq!(format_energy(Some(1234.56), "kWh"), "1234.56 kWh");
        assert_eq!(format_energy(Some(1.234), "MWh"), "1.23 MWh");
        assert_eq!(format_energy(None, ENERGY_UNIT), "0.00 kWh");
    }

    #[test]
    fn test_values_before_and_after_first_tick() {
        let energy = EnergySensor::default();
        let cost = CostSensor::new("Total Cost", "EUR", "fortum:energy_cost");
        assert_eq!(energy.native_value(None), None);
        assert_eq!(energy.native_value(Some(&[])), Some(0.0));
        assert_eq!(cost.native_value(Some(&[])), Some(0.0));
        assert!(energy.attributes(Some(&[])).is_none());
        assert!(cost.attributes(None).is_none());
    }
}
