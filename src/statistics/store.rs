//! Statistics store collaborators
//!
//! The importer only needs to read the newest points of a series and to
//! write a batch of points together with the series metadata. Two stores
//! implement that contract: an in-memory map and a JSON file.

use crate::error::{Result, SyncError};
use crate::logging::{StructuredLogger, get_logger};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Descriptor written alongside every batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticMetadata {
    pub source: String,
    pub statistic_id: String,
    pub name: String,
    pub unit_of_measurement: String,
    pub has_mean: bool,
    pub has_sum: bool,
}

/// One hourly point of an external statistic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticPoint {
    /// Hour start
    pub start: DateTime<Utc>,
    /// Amount within the hour
    pub state: f64,
    /// Running total up to and including this hour
    pub sum: f64,
}

/// Persistence seam of the importer
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Up to `count` points of the series, most recent first
    async fn read_last(&self, statistic_id: &str, count: usize) -> Result<Vec<StatisticPoint>>;

    /// Store points, replacing any existing point with the same start
    async fn write_batch(
        &self,
        metadata: &StatisticMetadata,
        points: &[StatisticPoint],
    ) -> Result<()>;
}

/// A series as held by the stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSeries {
    pub metadata: StatisticMetadata,
    pub points: Vec<StatisticPoint>,
}

impl StoredSeries {
    fn merge(&mut self, metadata: &StatisticMetadata, points: &[StatisticPoint]) {
        self.metadata = metadata.clone();
        let mut by_start: BTreeMap<DateTime<Utc>, StatisticPoint> =
            self.points.iter().map(|p| (p.start, *p)).collect();
        for point in points {
            by_start.insert(point.start, *point);
        }
        self.points = by_start.into_values().collect();
    }
}

type SeriesMap = BTreeMap<String, StoredSeries>;

fn last_points(series: &SeriesMap, statistic_id: &str, count: usize) -> Vec<StatisticPoint> {
    series
        .get(statistic_id)
        .map(|s| s.points.iter().rev().take(count).copied().collect())
        .unwrap_or_default()
}

fn merge_into(series: &mut SeriesMap, metadata: &StatisticMetadata, points: &[StatisticPoint]) {
    series
        .entry(metadata.statistic_id.clone())
        .or_insert_with(|| StoredSeries {
            metadata: metadata.clone(),
            points: Vec::new(),
        })
        .merge(metadata, points);
}

/// Process-local store, used when no store file is configured and in tests
#[derive(Debug, Default)]
pub struct InMemoryStore {
    series: Mutex<SeriesMap>,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one series
    pub async fn series(&self, statistic_id: &str) -> Option<StoredSeries> {
        self.series.lock().await.get(statistic_id).cloned()
    }

    /// Number of `write_batch` calls served so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatisticsStore for InMemoryStore {
    async fn read_last(&self, statistic_id: &str, count: usize) -> Result<Vec<StatisticPoint>> {
        Ok(last_points(&*self.series.lock().await, statistic_id, count))
    }

    async fn write_batch(
        &self,
        metadata: &StatisticMetadata,
        points: &[StatisticPoint],
    ) -> Result<()> {
        merge_into(&mut *self.series.lock().await, metadata, points);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Store persisted as one pretty-printed JSON document
pub struct JsonFileStore {
    path: PathBuf,
    series: Mutex<SeriesMap>,
    logger: StructuredLogger,
}

impl JsonFileStore {
    /// Open the store, starting empty when the file does not exist yet
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let logger = get_logger("statistics_store");

        let series = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let series: SeriesMap = serde_json::from_str(&contents)?;
            logger.info(&format!(
                "Loaded {} statistic series from {}",
                series.len(),
                path.display()
            ));
            series
        } else {
            logger.info(&format!(
                "No statistics file at {}, starting empty",
                path.display()
            ));
            SeriesMap::new()
        };

        Ok(Self {
            path,
            series: Mutex::new(series),
            logger,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, series: &SeriesMap) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(series)?;
        // Write-then-rename keeps the previous file intact on failure
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            SyncError::statistics(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl StatisticsStore for JsonFileStore {
    async fn read_last(&self, statistic_id: &str, count: usize) -> Result<Vec<StatisticPoint>> {
        Ok(last_points(&*self.series.lock().await, statistic_id, count))
    }

    async fn write_batch(
        &self,
        metadata: &StatisticMetadata,
        points: &[StatisticPoint],
    ) -> Result<()> {
        let mut guard = self.series.lock().await;
        let mut updated = guard.clone();
        merge_into(&mut updated, metadata, points);
        self.persist(&updated).await?;
        *guard = updated;
        self.logger.debug(&format!(
            "Saved {} point(s) for {}",
            points.len(),
            metadata.statistic_id
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(id: &str) -> StatisticMetadata {
        StatisticMetadata {
            source: "fortum".to_string(),
            statistic_id: id.to_string(),
            name: "Energy Consumption".to_string(),
            unit_of_measurement: "kWh".to_string(),
            has_mean: false,
            has_sum: true,
        }
    }

    fn point(hour: u32, state: f64, sum: f64) -> StatisticPoint {
        StatisticPoint {
            start: DateTime::parse_from_rfc3339(&format!("2024-01-15T{:02}:00:00Z", hour))
                .unwrap()
                .with_timezone(&Utc),
            state,
            sum,
        }
    }

    #[tokio::test]
    async fn test_merge_replaces_same_start_and_sorts() {
        let store = InMemoryStore::new();
        let meta = metadata("fortum:energy_consumption");
        store
            .write_batch(&meta, &[point(20, 1.0, 1.0), point(19, 2.0, 3.0)])
            .await
            .unwrap();
        store
            .write_batch(&meta, &[point(20, 1.5, 4.5)])
            .await
            .unwrap();

        let series = store.series("fortum:energy_consumption").await.unwrap();
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].start, point(19, 0.0, 0.0).start);
        assert_eq!(series.points[1].state, 1.5);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_read_last_is_most_recent_first() {
        let store = InMemoryStore::new();
        let meta = metadata("fortum:energy_consumption");
        store
            .write_batch(
                &meta,
                &[point(18, 1.0, 1.0), point(19, 1.0, 2.0), point(20, 1.0, 3.0)],
            )
            .await
            .unwrap();

        let last = store
            .read_last("fortum:energy_consumption", 1)
            .await
            .unwrap();
        assert_eq!(last, vec![point(20, 1.0, 3.0)]);
        assert!(store.read_last("unknown", 1).await.unwrap().is_empty());
    }
}
