use crate::config::StatisticsConfig;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::model::{ConsumptionRecord, ENERGY_UNIT};
use crate::statistics::aggregate::{
    HourlyBucket, Series, cumulative_points, hourly_buckets, partition_complete,
};
use crate::statistics::store::{StatisticMetadata, StatisticPoint, StatisticsStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Outcome of importing one series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesImport {
    /// Points handed to the store
    pub points: usize,
    /// Hours held back by the completeness gate
    pub skipped_hours: Vec<DateTime<Utc>>,
    /// Running total after the last written point
    pub final_sum: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportSummary {
    pub energy: Option<SeriesImport>,
    pub cost: Option<SeriesImport>,
}

struct SeriesPlan {
    metadata: StatisticMetadata,
    points: Vec<StatisticPoint>,
    skipped_hours: Vec<DateTime<Utc>>,
    logger: StructuredLogger,
}

impl SeriesPlan {
    fn summary(&self) -> SeriesImport {
        SeriesImport {
            points: self.points.len(),
            skipped_hours: self.skipped_hours.clone(),
            final_sum: self.points.last().map(|p| p.sum),
        }
    }
}

/// Turns fine-grained records into hourly cumulative statistics
pub struct StatisticsImporter {
    config: StatisticsConfig,
    store: Arc<dyn StatisticsStore>,
}

impl StatisticsImporter {
    pub fn new(config: &StatisticsConfig, store: Arc<dyn StatisticsStore>) -> Self {
        Self {
            config: config.clone(),
            store,
        }
    }

    pub fn energy_statistic_id(&self) -> &str {
        &self.config.energy_statistic_id
    }

    pub fn cost_statistic_id(&self) -> &str {
        &self.config.cost_statistic_id
    }

    /// Import both series.
    ///
    /// Every batch is computed before the first write so an interrupted
    /// import never leaves one series half-prepared.
    pub async fn import(
        &self,
        records: &[ConsumptionRecord],
        currency: &str,
    ) -> Result<ImportSummary> {
        if records.is_empty() {
            return Ok(ImportSummary::default());
        }

        let energy = self
            .plan(
                Series::Energy,
                records,
                self.metadata(Series::Energy, currency),
                true,
            )
            .await?;
        let cost = self
            .plan(
                Series::Cost,
                records,
                self.metadata(Series::Cost, currency),
                self.config.gate_cost_series,
            )
            .await?;

        let mut summary = ImportSummary::default();
        for (series, plan) in [(Series::Energy, energy), (Series::Cost, cost)] {
            let outcome = plan.summary();
            if !plan.points.is_empty() {
                self.store.write_batch(&plan.metadata, &plan.points).await?;
                plan.logger.info(&format!(
                    "Imported {} hourly {} point(s) from {} record(s), cumulative {:.3} {}",
                    plan.points.len(),
                    series.as_str(),
                    records.len(),
                    outcome.final_sum.unwrap_or_default(),
                    plan.metadata.unit_of_measurement
                ));
            } else {
                plan.logger
                    .debug(&format!("No new {} hours to import", series.as_str()));
            }
            match series {
                Series::Energy => summary.energy = Some(outcome),
                Series::Cost => summary.cost = Some(outcome),
            }
        }
        Ok(summary)
    }

    fn metadata(&self, series: Series, currency: &str) -> StatisticMetadata {
        let (statistic_id, name, unit) = match series {
            Series::Energy => (
                &self.config.energy_statistic_id,
                &self.config.energy_name,
                ENERGY_UNIT,
            ),
            Series::Cost => (&self.config.cost_statistic_id, &self.config.cost_name, currency),
        };
        StatisticMetadata {
            source: self.config.source.clone(),
            statistic_id: statistic_id.clone(),
            name: name.clone(),
            unit_of_measurement: unit.to_string(),
            has_mean: false,
            has_sum: true,
        }
    }

    async fn plan(
        &self,
        series: Series,
        records: &[ConsumptionRecord],
        metadata: StatisticMetadata,
        gated: bool,
    ) -> Result<SeriesPlan> {
        let logger = get_logger_with_context(
            LogContext::new("statistics").with_statistic_id(&metadata.statistic_id),
        );

        let last = self
            .store
            .read_last(&metadata.statistic_id, 1)
            .await?
            .into_iter()
            .next();
        let cutoff = last.map(|p| p.start);

        let buckets = hourly_buckets(records, series, cutoff)?;
        let (buckets, skipped) = if gated {
            partition_complete(buckets, self.config.samples_per_hour)
        } else {
            (buckets, Vec::new())
        };
        if !skipped.is_empty() {
            logger.warn(&format!(
                "Skipping {} incomplete hour(s) (expected {} readings each): {}",
                skipped.len(),
                self.config.samples_per_hour,
                describe(&skipped)
            ));
        }

        let seed = seed_sum(last, &buckets);
        Ok(SeriesPlan {
            points: cumulative_points(&buckets, seed),
            skipped_hours: skipped.iter().map(|b| b.start).collect(),
            metadata,
            logger,
        })
    }
}

/// Sum to continue from. When the newest stored hour is recomputed it is
/// rewritten, so the running total restarts from the point before it.
fn seed_sum(last: Option<StatisticPoint>, buckets: &[HourlyBucket]) -> f64 {
    match (last, buckets.first()) {
        (Some(p), Some(first)) if first.start == p.start => p.sum - p.state,
        (Some(p), _) => p.sum,
        (None, _) => 0.0,
    }
}

fn describe(buckets: &[HourlyBucket]) -> String {
    buckets
        .iter()
        .map(|b| format!("{} ({} readings)", b.start.to_rfc3339(), b.count))
        .collect::<Vec<_>>()
        .join(", ")
}
