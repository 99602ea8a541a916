//! Hourly bucketing of consumption records
//!
//! Pure functions: filtering by cutoff, de-duplication, per-hour totals, the
//! completeness gate and running sums.

use crate::error::Result;
use crate::model::ConsumptionRecord;
use crate::statistics::store::StatisticPoint;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Which amount of a record a series accumulates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Energy,
    Cost,
}

impl Series {
    /// Amount contributed by a record, `None` when it does not take part
    pub fn amount(self, record: &ConsumptionRecord) -> Option<f64> {
        match self {
            Self::Energy => Some(record.value()),
            Self::Cost => record.cost(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Cost => "cost",
        }
    }
}

/// Total of one clock hour and how many readings made it up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyBucket {
    pub start: DateTime<Utc>,
    pub total: f64,
    pub count: u32,
}

/// Bucket records by hour for one series.
///
/// Records starting before `cutoff` are dropped; the cutoff itself is kept.
/// Readings sharing an instant are counted once, the later one in input
/// order winning.
pub fn hourly_buckets<'a, I>(
    records: I,
    series: Series,
    cutoff: Option<DateTime<Utc>>,
) -> Result<Vec<HourlyBucket>>
where
    I: IntoIterator<Item = &'a ConsumptionRecord>,
{
    let mut unique: BTreeMap<DateTime<Utc>, &ConsumptionRecord> = BTreeMap::new();
    for record in records {
        let at = record.timestamp().with_timezone(&Utc);
        if cutoff.is_some_and(|c| at < c) {
            continue;
        }
        unique.insert(at, record);
    }

    let mut buckets: BTreeMap<DateTime<Utc>, HourlyBucket> = BTreeMap::new();
    for record in unique.into_values() {
        let Some(amount) = series.amount(record) else {
            continue;
        };
        let start = record.hour_start()?;
        let bucket = buckets.entry(start).or_insert(HourlyBucket {
            start,
            total: 0.0,
            count: 0,
        });
        bucket.total += amount;
        bucket.count += 1;
    }
    Ok(buckets.into_values().collect())
}

/// Split buckets into complete and incomplete hours
pub fn partition_complete(
    buckets: Vec<HourlyBucket>,
    samples_per_hour: u32,
) -> (Vec<HourlyBucket>, Vec<HourlyBucket>) {
    buckets
        .into_iter()
        .partition(|b| b.count == samples_per_hour)
}

/// Running sums starting from `seed`, one point per bucket
pub fn cumulative_points(buckets: &[HourlyBucket], seed: f64) -> Vec<StatisticPoint> {
    let mut sum = seed;
    buckets
        .iter()
        .map(|b| {
            sum += b.total;
            StatisticPoint {
                start: b.start,
                state: b.total,
                sum,
            }
        })
        .collect()
}
