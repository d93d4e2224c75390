use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::{
    domain::PaymentMethod,
    error::{AppError, Result},
    payments::{
        format_major_amount, http_client, parse_major_amount, GatewayInit, GatewayInitRequest,
        GatewayStatus, GatewayVerification, PaymentGateway,
    },
};

const PAYPAL_LIVE_API: &str = "https://api-m.paypal.com";
const PAYPAL_SANDBOX_API: &str = "https://api-m.sandbox.paypal.com";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct PaypalLink {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct CreatedOrder {
    id: String,
    #[serde(default)]
    links: Vec<PaypalLink>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct PaypalGateway {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl PaypalGateway {
    pub fn new(client_id: String, client_secret: String, sandbox: bool) -> Result<Self> {
        let base_url = if sandbox { PAYPAL_SANDBOX_API } else { PAYPAL_LIVE_API };
        Ok(Self {
            client: http_client()?,
            client_id,
            client_secret,
            base_url: base_url.to_string(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.token.clone());
            }
        }

        let form = serde_urlencoded::to_string([("grant_type", "client_credentials")])
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::External(format!(
                "PayPal authentication failed: {}",
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await?;
        // Refresh a minute early so in-flight calls never carry a stale token
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn fetch_order(&self, token: &str, reference: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/v2/checkout/orders/{}", self.base_url, urlencoding::encode(reference)))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("PayPal order {} not found", reference)));
        }
        Ok(response.error_for_status()?.json().await?)
    }

    async fn capture_order(&self, token: &str, reference: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.base_url,
                urlencoding::encode(reference)
            ))
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!("PayPal capture failed ({}): {}", status, body)));
        }
        Ok(response.json().await?)
    }
}

/// Pulls the settled (or requested) amount out of a PayPal order body.
fn order_amount(order: &serde_json::Value) -> Option<(i64, String)> {
    let unit = order.pointer("/purchase_units/0")?;
    let amount = unit
        .pointer("/payments/captures/0/amount")
        .or_else(|| unit.get("amount"))?;
    let value = parse_major_amount(amount.get("value")?.as_str()?)?;
    let currency = amount.get("currency_code")?.as_str()?.to_string();
    Some((value, currency))
}

#[async_trait]
impl PaymentGateway for PaypalGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Paypal
    }

    async fn initialize(&self, request: &GatewayInitRequest) -> Result<GatewayInit> {
        let token = self.access_token().await?;
        let order_id = request.order_id.to_string();

        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": order_id,
                "custom_id": order_id,
                "description": request.description,
                "amount": {
                    "currency_code": request.currency,
                    "value": format_major_amount(request.amount_minor),
                },
            }],
            "application_context": {
                "return_url": format!("{}?order_id={}&provider=paypal", request.callback_url, order_id),
                "cancel_url": format!("{}?order_id={}&cancelled=true", request.callback_url, order_id),
                "user_action": "PAY_NOW",
            },
        });

        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!("PayPal order creation failed ({}): {}", status, body)));
        }

        let created: CreatedOrder = response.json().await?;
        let payment_url = created
            .links
            .iter()
            .find(|link| link.rel == "approve" || link.rel == "payer-action")
            .map(|link| link.href.clone())
            .ok_or_else(|| AppError::External("PayPal returned no approval link".to_string()))?;

        Ok(GatewayInit {
            reference: created.id,
            payment_url,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification> {
        let token = self.access_token().await?;
        let mut order = self.fetch_order(&token, reference).await?;

        // An approved order still has to be captured before money moves
        if order.get("status").and_then(|s| s.as_str()) == Some("APPROVED") {
            order = self.capture_order(&token, reference).await?;
        }

        let status = match order.get("status").and_then(|s| s.as_str()) {
            Some("COMPLETED") => GatewayStatus::Success,
            Some("CREATED") | Some("SAVED") | Some("APPROVED") | Some("PAYER_ACTION_REQUIRED") => {
                GatewayStatus::Pending
            }
            _ => GatewayStatus::Failed,
        };

        let (amount_minor, currency) = order_amount(&order).unwrap_or((0, String::new()));

        Ok(GatewayVerification {
            reference: reference.to_string(),
            status,
            amount_minor,
            currency,
            raw: order,
        })
    }
}
