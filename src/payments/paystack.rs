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

const PAYSTACK_API: &str = "https://api.paystack.co";

/// Paystack envelope: `{ "status": bool, "message": str, "data": {...} }`
#[derive(Debug, Deserialize)]
struct PaystackResponse<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    reference: String,
    amount: i64,
    currency: String,
}

pub struct PaystackGateway {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl PaystackGateway {
    pub fn new(secret_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            secret_key,
            base_url: PAYSTACK_API.to_string(),
        })
    }

    fn unwrap_envelope<T>(envelope: PaystackResponse<T>) -> Result<T> {
        if !envelope.status {
            return Err(AppError::Payment(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| AppError::External("Paystack returned no data".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Paystack
    }

    async fn initialize(&self, request: &GatewayInitRequest) -> Result<GatewayInit> {
        let reference = generate_reference("SM", request.order_id);

        let body = json!({
            "email": request.payer_email,
            // Paystack expects the subunit (kobo for NGN)
            "amount": request.amount_minor,
            "currency": request.currency,
            "reference": reference,
            "callback_url": request.callback_url,
            "metadata": {
                "order_id": request.order_id.to_string(),
                "description": request.description,
            },
        });

        let envelope: PaystackResponse<InitializeData> = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        let data = Self::unwrap_envelope(envelope)?;
        tracing::info!(order_id = %request.order_id, reference = %data.reference, "Paystack transaction initialized");

        Ok(GatewayInit {
            reference: data.reference,
            payment_url: data.authorization_url,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification> {
        let raw: serde_json::Value = self
            .client
            .get(format!(
                "{}/transaction/verify/{}",
                self.base_url,
                urlencoding::encode(reference)
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await?
            .json()
            .await?;

        let envelope: PaystackResponse<VerifyData> = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::External(format!("Unexpected Paystack response: {}", e)))?;
        let data = Self::unwrap_envelope(envelope)?;

        let status = match data.status.as_str() {
            "success" => GatewayStatus::Success,
            "ongoing" | "pending" | "processing" | "queued" => GatewayStatus::Pending,
            _ => GatewayStatus::Failed,
        };

        Ok(GatewayVerification {
            reference: data.reference,
            status,
            amount_minor: data.amount,
            currency: data.currency,
            raw,
        })
    }
}
