//! Hourly statistics import
//!
//! Fine-grained consumption records are summed per clock hour, filtered by
//! completeness and written as cumulative external statistics.

pub mod aggregate;
pub mod importer;
pub mod store;

pub use aggregate::{HourlyBucket, Series};
pub use importer::{ImportSummary, SeriesImport, StatisticsImporter};
pub use store::{
    InMemoryStore, JsonFileStore, StatisticMetadata, StatisticPoint, StatisticsStore,
    StoredSeries,
};
