//! # fortum-sync - Fortum consumption poller
//!
//! Polls the Fortum customer API for fine-grained electricity consumption,
//! republishes the current window through sensors and imports hourly
//! cumulative energy and cost statistics into a store.
//!
//! ## Features
//!
//! - **Publication-aware polling**: no requests before the provider publishes
//!   yesterday's data, retries until it shows up, then quiet until tomorrow
//! - **Hourly statistics**: 15-minute readings summed per clock hour, with a
//!   completeness gate and running sums that survive restarts
//! - **Locales**: Finnish, Swedish and Norwegian endpoints and currencies
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `fortum`: Provider endpoints, wire types and HTTP client
//! - `model`: Consumption records
//! - `coordinator`: Publication-threshold scheduler and tick loop body
//! - `statistics`: Hourly aggregation, import and stores
//! - `sensor`: Display adapters over the latest data

pub mod config;
pub mod coordinator;
pub mod error;
pub mod fortum;
pub mod logging;
pub mod model;
pub mod sensor;
pub mod statistics;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{Coordinator, PollingTask, PublicationSchedule, SchedulerState};
pub use error::{Result, SyncError};
pub use model::ConsumptionRecord;
