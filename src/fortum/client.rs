use crate::config::FortumConfig;
use crate::error::{Result, SyncError};
use crate::fortum::ConsumptionSource;
use crate::fortum::endpoints::Locale;
use crate::fortum::types::{TimeSeries, TrpcResponse, into_records};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::model::ConsumptionRecord;
use chrono::{TimeDelta, Utc};
use chrono_tz::Tz;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, REFERER, USER_AGENT};
use std::time::Duration;

/// HTTP client for the provider's logged-in time-series API
pub struct FortumClient {
    http: reqwest::Client,
    locale: Locale,
    session_token: String,
    metering_points: Vec<String>,
    resolution: String,
    lookback: TimeDelta,
    timezone: Tz,
    logger: StructuredLogger,
}

impl FortumClient {
    pub fn new(config: &FortumConfig, timezone: Tz) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let locale = config.locale()?;
        let logger = get_logger_with_context(
            LogContext::new("fortum").with_field("locale", locale.to_string()),
        );
        Ok(Self {
            http,
            locale,
            session_token: config.session_token.trim().to_string(),
            metering_points: config.metering_points.clone(),
            resolution: config.resolution.clone(),
            lookback: TimeDelta::days(i64::from(config.lookback_days)),
            timezone,
            logger,
        })
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    fn user_agent() -> String {
        format!("fortum-sync/{}", env!("APP_VERSION"))
    }

    fn require_token(&self) -> Result<&str> {
        if self.session_token.is_empty() {
            return Err(SyncError::auth(
                "Authentication failed: no session token configured",
            ));
        }
        Ok(&self.session_token)
    }

    fn check_status(status: StatusCode) -> Result<()> {
        match status {
            StatusCode::UNAUTHORIZED => Err(SyncError::auth("Token expired")),
            StatusCode::FORBIDDEN => Err(SyncError::auth("Access forbidden")),
            s if !s.is_success() => Err(SyncError::api(format!(
                "Unexpected HTTP status {}",
                s
            ))),
            _ => Ok(()),
        }
    }

    /// Ask the session endpoint whether the token is still accepted
    pub async fn verify_session(&self) -> Result<()> {
        let token = self.require_token()?;
        let resp = self
            .http
            .get(self.locale.session_url())
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, Self::user_agent())
            .send()
            .await?;
        Self::check_status(resp.status())?;

        let body: serde_json::Value = resp.json().await?;
        // An expired session answers 200 with an empty object
        if body.get("user").is_none() {
            return Err(SyncError::auth("Token expired: session has no user"));
        }
        self.logger.info("Session token accepted");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConsumptionSource for FortumClient {
    async fn fetch_consumption(&self) -> Result<Option<Vec<ConsumptionRecord>>> {
        let token = self.require_token()?;
        if self.metering_points.is_empty() {
            return Err(SyncError::config("No metering points configured"));
        }

        let to = Utc::now();
        let from = to - self.lookback;
        let url =
            self.locale
                .time_series_url(&self.metering_points, from, to, &self.resolution)?;
        self.logger.debug(&format!(
            "Requesting {} data for {} metering point(s) from {} to {}",
            self.resolution,
            self.metering_points.len(),
            from,
            to
        ));

        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, "application/json")
            .header(REFERER, self.locale.referer())
            .header(USER_AGENT, Self::user_agent())
            .send()
            .await?;
        Self::check_status(resp.status())?;

        let batch: Vec<TrpcResponse<Vec<TimeSeries>>> = resp.json().await?;
        let series = match batch.into_iter().next() {
            Some(TrpcResponse::Success { result }) => result.data.json,
            Some(TrpcResponse::Failure { error }) => return Err(error.json.into_sync_error()),
            None => return Err(SyncError::api("Empty tRPC batch response")),
        };

        let Some(series) = series else {
            self.logger.debug("Time series payload was empty");
            return Ok(None);
        };
        let records = into_records(series, self.timezone)?;
        self.logger.debug(&format!(
            "Fetched {} records with resolution {}",
            records.len(),
            self.resolution
        ));
        Ok(Some(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = FortumClient::check_status(StatusCode::UNAUTHORIZED).unwrap_err();
        assert!(err.to_string().contains("Token expired"));
        let err = FortumClient::check_status(StatusCode::FORBIDDEN).unwrap_err();
        assert!(err.to_string().contains("Access forbidden"));
        let err = FortumClient::check_status(StatusCode::BAD_GATEWAY).unwrap_err();
        assert!(matches!(err, SyncError::Api { .. }));
        assert!(FortumClient::check_status(StatusCode::OK).is_ok());
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_failure() {
        let config = FortumConfig {
            metering_points: vec!["6400000123456".to_string()],
            ..FortumConfig::default()
        };
        let client = FortumClient::new(&config, chrono_tz::Europe::Helsinki).unwrap();
        let err = client.fetch_consumption().await.unwrap_err();
        assert!(matches!(err, SyncError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_missing_metering_points_is_config_error() {
        let config = FortumConfig {
            session_token: "token".to_string(),
            ..FortumConfig::default()
        };
        let client = FortumClient::new(&config, chrono_tz::Europe::Helsinki).unwrap();
        let err = client.fetch_consumption().await.unwrap_err();
        assert!(matches!(err, SyncError::Config { .. }));
        assert_eq!(client.locale(), Locale::Fi);
    }
}
