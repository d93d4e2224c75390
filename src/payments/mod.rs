use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::PaymentsConfig,
    domain::PaymentMethod,
    error::{AppError, Result},
};

pub mod fake;
pub mod flutterwave;
pub mod paypal;
pub mod paystack;
pub mod stripe_client;
pub mod webhook;

pub use fake::FakeGateway;
pub use flutterwave::FlutterwaveGateway;
pub use paypal::PaypalGateway;
pub use paystack::PaystackGateway;
pub use stripe_client::StripeGateway;

/// What the marketplace asks a gateway to charge.
#[derive(Debug, Clone)]
pub struct GatewayInitRequest {
    pub order_id: Uuid,
    pub payer_email: String,
    /// Minor units of `currency`
    pub amount_minor: i64,
    pub currency: String,
    pub description: String,
    pub callback_url: String,
}

/// Hosted checkout handle returned by a gateway.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayInit {
    pub reference: String,
    pub payment_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Success,
    Pending,
    Failed,
}

/// Normalized verification result, whatever the provider.
#[derive(Debug, Clone)]
pub struct GatewayVerification {
    pub reference: String,
    pub status: GatewayStatus,
    pub amount_minor: i64,
    pub currency: String,
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn method(&self) -> PaymentMethod;
    async fn initialize(&self, request: &GatewayInitRequest) -> Result<GatewayInit>;
    async fn verify(&self, reference: &str) -> Result<GatewayVerification>;
}

/// The enabled gateways, keyed by payment method.
#[derive(Default)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentMethod, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        tracing::info!("Registered payment gateway: {}", gateway.method().as_str());
        self.gateways.insert(gateway.method(), gateway);
    }

    pub fn get(&self, method: PaymentMethod) -> Result<Arc<dyn PaymentGateway>> {
        self.gateways.get(&method).cloned().ok_or_else(|| {
            AppError::BadRequest(format!("Payment method {} is not available", method.as_str()))
        })
    }

    pub fn methods(&self) -> Vec<PaymentMethod> {
        self.gateways.keys().copied().collect()
    }

    /// Builds every gateway that is enabled and fully configured.
    pub fn from_config(config: &PaymentsConfig) -> Result<Self> {
        let mut registry = Self::new();

        if config.paystack.enabled {
            match config.paystack.secret_key.clone() {
                Some(key) => registry.register(Arc::new(PaystackGateway::new(key)?)),
                None => tracing::warn!("Paystack enabled but missing secret key"),
            }
        }

        if config.stripe.enabled {
            match config.stripe.secret_key.clone() {
                Some(key) => registry.register(Arc::new(StripeGateway::new(key))),
                None => tracing::warn!("Stripe enabled but missing secret key"),
            }
        }

        if config.paypal.enabled {
            match (config.paypal.client_id.clone(), config.paypal.client_secret.clone()) {
                (Some(id), Some(secret)) => {
                    registry.register(Arc::new(PaypalGateway::new(id, secret, config.paypal.sandbox)?))
                }
                _ => tracing::warn!("PayPal enabled but missing client credentials"),
            }
        }

        if config.flutterwave.enabled {
            match config.flutterwave.secret_key.clone() {
                Some(key) => registry.register(Arc::new(FlutterwaveGateway::new(key)?)),
                None => tracing::warn!("Flutterwave enabled but missing secret key"),
            }
        }

        if registry.gateways.is_empty() {
            tracing::warn!("No payment gateways configured; checkout is disabled");
        }

        Ok(registry)
    }
}

/// Shared HTTP client for the REST gateways.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Merchant reference for gateways that let us choose one.
pub(crate) fn generate_reference(prefix: &str, order_id: Uuid) -> String {
    use rand::Rng;
    let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("{}_{}_{}", prefix, order_id.simple(), suffix)
}

/// Parses a decimal major-unit amount ("50", "50.5", "50.00") into minor units.
pub(crate) fn parse_major_amount(value: &str) -> Option<i64> {
    let value = value.trim();
    let (whole, frac) = match value.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (value, ""),
    };
    if whole.is_empty() || frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = whole.parse().ok()?;
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    if whole < 0 {
        return None;
    }
    whole.checked_mul(100)?.checked_add(frac)
}

/// Formats minor units as a two-decimal major-unit string.
pub(crate) fn format_major_amount(amount_minor: i64) -> String {
    format!("{}.{:02}", amount_minor / 100, amount_minor % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_major_amount() {
        assert_eq!(parse_major_amount("50"), Some(5_000));
        assert_eq!(parse_major_amount("50.5"), Some(5_050));
        assert_eq!(parse_major_amount("50.05"), Some(5_005));
        assert_eq!(parse_major_amount(" 82.10 "), Some(8_210));
        assert_eq!(parse_major_amount("1.234"), None);
        assert_eq!(parse_major_amount("abc"), None);
        assert_eq!(parse_major_amount(".50"), None);
    }

    #[test]
    fn test_format_major_amount() {
        assert_eq!(format_major_amount(5_000), "50.00");
        assert_eq!(format_major_amount(8_210), "82.10");
        assert_eq!(format_major_amount(7), "0.07");
    }

    #[test]
    fn test_generate_reference() {
        let order_id = Uuid::new_v4();
        let a = generate_reference("SM", order_id);
        let b = generate_reference("SM", order_id);
        assert!(a.starts_with(&format!("SM_{}_", order_id.simple())));
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_registry_rejects_unconfigured_method() {
        let mut registry = GatewayRegistry::new();
        registry.register(Arc::new(FakeGateway::new(PaymentMethod::Stripe)));

        assert!(registry.get(PaymentMethod::Stripe).is_ok());
        assert!(matches!(
            registry.get(PaymentMethod::Paypal),
            Err(AppError::BadRequest(_))
        ));
    }
}
