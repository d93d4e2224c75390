use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{
    domain::PaymentMethod,
    error::{AppError, Result},
    payments::{
        generate_reference, http_client, GatewayInit, GatewayInitRequest, GatewayStatus,
        GatewayVerification, PaymentGateway,
    },
};

const FLUTTERWAVE_API: &str = "https://api.flutterwave.com/v3";

#[derive(Debug, Deserialize)]
struct FlutterwaveResponse<T> {
    status: String,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PaymentLink {
    link: String,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    status: String,
    tx_ref: String,
    amount: f64,
    currency: String,
}

pub struct FlutterwaveGateway {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl FlutterwaveGateway {
    pub fn new(secret_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            secret_key,
            base_url: FLUTTERWAVE_API.to_string(),
        })
    }

    fn unwrap_envelope<T>(envelope: FlutterwaveResponse<T>) -> Result<T> {
        if envelope.status != "success" {
            return Err(AppError::Payment(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| AppError::External("Flutterwave returned no data".to_string()))
    }
}

/// Flutterwave reports amounts in major units.
fn major_to_minor(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Flutterwave
    }

    async fn initialize(&self, request: &GatewayInitRequest) -> Result<GatewayInit> {
        let tx_ref = generate_reference("SMF", request.order_id);

        let body = json!({
            "tx_ref": tx_ref,
            "amount": request.amount_minor as f64 / 100.0,
            "currency": request.currency,
            "redirect_url": format!("{}?order_id={}&provider=flutterwave", request.callback_url, request.order_id),
            "customer": { "email": request.payer_email },
            "customizations": { "title": request.description },
            "meta": { "order_id": request.order_id.to_string() },
        });

        let envelope: FlutterwaveResponse<PaymentLink> = self
            .client
            .post(format!("{}/payments", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        let data = Self::unwrap_envelope(envelope)?;

        Ok(GatewayInit {
            reference: tx_ref,
            payment_url: data.link,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification> {
        let raw: serde_json::Value = self
            .client
            .get(format!("{}/transactions/verify_by_reference", self.base_url))
            .query(&[("tx_ref", reference)])
            .bearer_auth(&self.secret_key)
            .send()
            .await?
            .json()
            .await?;

        let envelope: FlutterwaveResponse<TransactionData> = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::External(format!("Unexpected Flutterwave response: {}", e)))?;
        let data = Self::unwrap_envelope(envelope)?;

        let status = match data.status.as_str() {
            "successful" => GatewayStatus::Success,
            "pending" => GatewayStatus::Pending,
            _ => GatewayStatus::Failed,
        };

        Ok(GatewayVerification {
            reference: data.tx_ref,
            status,
            amount_minor: major_to_minor(data.amount),
            currency: data.currency,
            raw,
        })
    }
}
