//! Wire types of the batched tRPC time-series response
//!
//! A batch of one call comes back as a one-element array whose entry holds
//! either `result.data.json` or `error.json`.

use crate::error::{Result, SyncError};
use crate::model::{ConsumptionRecord, ENERGY_UNIT};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TrpcResponse<T> {
    Success { result: TrpcResult<T> },
    Failure { error: TrpcErrorEnvelope },
}

#[derive(Debug, Deserialize)]
pub struct TrpcResult<T> {
    pub data: TrpcData<T>,
}

#[derive(Debug, Deserialize)]
pub struct TrpcData<T> {
    pub json: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct TrpcErrorEnvelope {
    pub json: TrpcError,
}

#[derive(Debug, Deserialize)]
pub struct TrpcError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<TrpcErrorData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrpcErrorData {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub http_status: Option<u16>,
}

impl TrpcError {
    /// Map a procedure error onto the crate error, keeping auth failures
    /// recognisable by their message
    pub fn into_sync_error(self) -> SyncError {
        let status = self.data.as_ref().and_then(|d| d.http_status);
        let code = self
            .data
            .as_ref()
            .and_then(|d| d.code.clone())
            .unwrap_or_default();
        match (status, code.as_str()) {
            (Some(401), _) | (_, "UNAUTHORIZED") => {
                SyncError::auth(format!("Token expired: {}", self.message))
            }
            (Some(403), _) | (_, "FORBIDDEN") => {
                SyncError::auth(format!("Access forbidden: {}", self.message))
            }
            _ => SyncError::api(format!("tRPC error {}: {}", code, self.message)),
        }
    }
}

/// One metering point's series
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub metering_point_no: String,
    #[serde(default)]
    pub measurement_unit: Option<String>,
    #[serde(default)]
    pub series: Vec<SeriesEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEntry {
    pub at_utc: DateTime<Utc>,
    #[serde(default)]
    pub energy: Vec<EnergyValue>,
    #[serde(default)]
    pub cost: Option<Vec<CostValue>>,
}

#[derive(Debug, Deserialize)]
pub struct EnergyValue {
    pub value: f64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CostValue {
    pub total: f64,
}

impl SeriesEntry {
    fn energy_total(&self) -> f64 {
        self.energy.iter().map(|e| e.value).sum()
    }

    fn cost_total(&self) -> Option<f64> {
        match self.cost.as_deref() {
            Some(costs) if !costs.is_empty() => Some(costs.iter().map(|c| c.total).sum()),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct InstantTotal {
    unit: String,
    energy: f64,
    cost: Option<f64>,
}

/// Combine all metering points into one record per instant, expressed in
/// `tz` and sorted by timestamp. Energy and defined costs of points sharing
/// an instant are summed.
pub fn into_records(series: Vec<TimeSeries>, tz: Tz) -> Result<Vec<ConsumptionRecord>> {
    let mut totals: BTreeMap<DateTime<Utc>, InstantTotal> = BTreeMap::new();
    for ts in series {
        let unit = ts
            .measurement_unit
            .clone()
            .unwrap_or_else(|| ENERGY_UNIT.to_string());
        for entry in &ts.series {
            let total = totals.entry(entry.at_utc).or_insert_with(|| InstantTotal {
                unit: unit.clone(),
                energy: 0.0,
                cost: None,
            });
            total.energy += entry.energy_total();
            if let Some(cost) = entry.cost_total() {
                total.cost = Some(total.cost.unwrap_or(0.0) + cost);
            }
        }
    }

    totals
        .into_iter()
        .map(|(at, total)| {
            ConsumptionRecord::new(
                at.with_timezone(&tz).fixed_offset(),
                total.energy,
                total.unit,
                total.cost,
            )
        })
        .collect()
}
