//! Fortum customer API integration
//!
//! Locale-aware endpoints, the tRPC wire types and the HTTP client that turns
//! them into [`ConsumptionRecord`]s.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::FortumClient;
pub use endpoints::Locale;

use crate::error::Result;
use crate::model::ConsumptionRecord;

/// Source of consumption data polled by the coordinator
#[async_trait::async_trait]
pub trait ConsumptionSource: Send + Sync {
    /// Fetch the most recent window of records. `Ok(None)` means the provider
    /// answered without a payload.
    async fn fetch_consumption(&self) -> Result<Option<Vec<ConsumptionRecord>>>;
}
