use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::config::CurrencyConfig;

pub mod providers;

pub use providers::{HttpRateProvider, RateProvider, StaticRateProvider};

/// Used when every upstream provider fails and nothing was ever cached.
pub const FALLBACK_USD_NGN: f64 = 1650.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Live,
    Cached,
    StaleCache,
    Fallback,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RateQuote {
    pub rate: f64,
    pub source: RateSource,
    pub provider: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NgnConversion {
    pub ngn_amount_minor: i64,
    pub exchange_rate: f64,
    pub converted_at: DateTime<Utc>,
}

struct CachedRate {
    rate: f64,
    provider: String,
    fetched_at: DateTime<Utc>,
    expires_at: Instant,
}

/// USD/NGN conversion backed by an ordered list of rate providers and a
/// TTL cache owned by the service instance.
pub struct CurrencyService {
    providers: Vec<Arc<dyn RateProvider>>,
    ttl: Duration,
    fallback_rate: f64,
    cache: Mutex<Option<CachedRate>>,
}

impl CurrencyService {
    pub fn new(providers: Vec<Arc<dyn RateProvider>>, ttl: Duration, fallback_rate: f64) -> Self {
        Self {
            providers,
            ttl,
            fallback_rate,
            cache: Mutex::new(None),
        }
    }

    pub fn from_config(config: &CurrencyConfig) -> crate::error::Result<Self> {
        let providers: Vec<Arc<dyn RateProvider>> = match config.fixed_usd_ngn {
            Some(rate) => {
                tracing::info!("Using fixed USD/NGN rate {}", rate);
                vec![Arc::new(StaticRateProvider::new(rate))]
            }
            None => config
                .providers
                .iter()
                .map(|p| {
                    HttpRateProvider::new(&p.name, &p.url, &p.pointer)
                        .map(|provider| Arc::new(provider) as Arc<dyn RateProvider>)
                })
                .collect::<crate::error::Result<_>>()?,
        };

        Ok(Self::new(
            providers,
            Duration::from_secs(config.cache_ttl_secs),
            config.fallback_usd_ngn,
        ))
    }

    /// Current NGN-per-USD rate with its provenance.
    pub async fn quote(&self) -> RateQuote {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.expires_at > Instant::now() {
                return RateQuote {
                    rate: cached.rate,
                    source: RateSource::Cached,
                    provider: Some(cached.provider.clone()),
                    fetched_at: cached.fetched_at,
                };
            }
        }

        for provider in &self.providers {
            match provider.usd_to_ngn().await {
                Ok(rate) if rate.is_finite() && rate > 0.0 => {
                    let fetched_at = Utc::now();
                    *cache = Some(CachedRate {
                        rate,
                        provider: provider.name().to_string(),
                        fetched_at,
                        expires_at: Instant::now() + self.ttl,
                    });
                    tracing::debug!(provider = provider.name(), rate, "Refreshed USD/NGN rate");
                    return RateQuote {
                        rate,
                        source: RateSource::Live,
                        provider: Some(provider.name().to_string()),
                        fetched_at,
                    };
                }
                Ok(rate) => {
                    tracing::warn!(provider = provider.name(), rate, "Rate provider returned an unusable rate");
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), "Rate provider failed: {}", e);
                }
            }
        }

        // Every provider failed: an expired rate beats the static fallback
        if let Some(cached) = cache.as_ref() {
            tracing::warn!("All rate providers failed; serving expired cached rate");
            return RateQuote {
                rate: cached.rate,
                source: RateSource::StaleCache,
                provider: Some(cached.provider.clone()),
                fetched_at: cached.fetched_at,
            };
        }

        tracing::warn!("All rate providers failed; using fallback rate {}", self.fallback_rate);
        RateQuote {
            rate: self.fallback_rate,
            source: RateSource::Fallback,
            provider: None,
            fetched_at: Utc::now(),
        }
    }

    pub async fn usd_to_ngn_rate(&self) -> f64 {
        self.quote().await.rate
    }

    pub async fn convert_usd_to_ngn(&self, usd_minor: i64) -> NgnConversion {
        let rate = self.usd_to_ngn_rate().await;
        NgnConversion {
            ngn_amount_minor: (usd_minor as f64 * rate).round() as i64,
            exchange_rate: rate,
            converted_at: Utc::now(),
        }
    }

    /// Returns `(usd_minor, rate)`.
    pub async fn convert_ngn_to_usd(&self, ngn_minor: i64) -> (i64, f64) {
        let rate = self.usd_to_ngn_rate().await;
        ((ngn_minor as f64 / rate).round() as i64, rate)
    }

    pub async fn clear_cache(&self) {
        *self.cache.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        rate: Option<f64>,
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new(rate: Option<f64>) -> Arc<Self> {
            Arc::new(Self { rate, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn usd_to_ngn(&self) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rate
                .ok_or_else(|| AppError::External("provider unreachable".to_string()))
        }
    }

    fn service(providers: Vec<Arc<dyn RateProvider>>, ttl: Duration) -> CurrencyService {
        CurrencyService::new(providers, ttl, FALLBACK_USD_NGN)
    }

    #[tokio::test]
    async fn test_fallback_when_all_providers_fail() {
        let a = CountingProvider::new(None);
        let b = CountingProvider::new(None);
        let svc = service(vec![a.clone(), b.clone()], Duration::from_secs(1800));

        assert_eq!(svc.usd_to_ngn_rate().await, 1650.0);
        assert_eq!(svc.quote().await.source, RateSource::Fallback);
        // The fallback is not cached, so every call retries upstream
        assert_eq!(a.calls(), 2);
        assert_eq!(b.calls(), 2);
    }

    #[tokio::test]
    async fn test_rate_is_cached_within_ttl() {
        let provider = CountingProvider::new(Some(1600.0));
        let svc = service(vec![provider.clone()], Duration::from_secs(1800));

        assert_eq!(svc.quote().await.source, RateSource::Live);
        assert_eq!(svc.quote().await.source, RateSource::Cached);
        assert_eq!(svc.usd_to_ngn_rate().await, 1600.0);
        assert_eq!(provider.calls(), 1);

        svc.clear_cache().await;
        svc.usd_to_ngn_rate().await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_rate_is_refreshed() {
        let provider = CountingProvider::new(Some(1600.0));
        let svc = service(vec![provider.clone()], Duration::ZERO);

        svc.usd_to_ngn_rate().await;
        svc.usd_to_ngn_rate().await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_falls_through_to_next_provider() {
        let broken = CountingProvider::new(None);
        let zero = CountingProvider::new(Some(0.0));
        let good = CountingProvider::new(Some(1580.5));
        let svc = service(vec![broken, zero, good], Duration::from_secs(60));

        let quote = svc.quote().await;
        assert_eq!(quote.rate, 1580.5);
        assert_eq!(quote.source, RateSource::Live);
    }

    #[tokio::test]
    async fn test_conversion_rounds_to_minor_units() {
        let svc = service(vec![Arc::new(StaticRateProvider::new(1600.0))], Duration::from_secs(60));

        let conversion = svc.convert_usd_to_ngn(5_000).await;
        assert_eq!(conversion.ngn_amount_minor, 8_000_000);
        assert_eq!(conversion.exchange_rate, 1600.0);

        assert_eq!(svc.convert_ngn_to_usd(8_000_000).await, (5_000, 1600.0));
    }
}
