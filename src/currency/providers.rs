use async_trait::async_trait;
use std::time::Duration;

use crate::error::{AppError, Result};

/// A source of the NGN-per-USD exchange rate.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn usd_to_ngn(&self) -> Result<f64>;
}

/// Fetches a JSON document and reads the rate at a JSON pointer.
pub struct HttpRateProvider {
    name: String,
    url: String,
    pointer: String,
    client: reqwest::Client,
}

impl HttpRateProvider {
    pub fn new(name: &str, url: &str, pointer: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            pointer: pointer.to_string(),
            client,
        })
    }
}

pub(crate) fn read_rate(body: &serde_json::Value, pointer: &str) -> Option<f64> {
    let value = body.pointer(pointer)?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn usd_to_ngn(&self) -> Result<f64> {
        let body: serde_json::Value = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        read_rate(&body, &self.pointer).ok_or_else(|| {
            AppError::External(format!("{} response has no rate at {}", self.name, self.pointer))
        })
    }
}

/// Always answers with the same rate.
pub struct StaticRateProvider {
    rate: f64,
}

impl StaticRateProvider {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn usd_to_ngn(&self) -> Result<f64> {
        Ok(self.rate)
    }
}
