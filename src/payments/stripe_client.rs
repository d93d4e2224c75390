use async_trait::async_trait;
use stripe::{
    CheckoutSession, CheckoutSessionId, CheckoutSessionMode, CheckoutSessionPaymentStatus,
    Client, CreateCheckoutSession, CreateCheckoutSessionLineItems, Currency, EventObject,
    EventType, Webhook, WebhookError,
};

use crate::{
    domain::PaymentMethod,
    error::{AppError, Result},
    payments::{GatewayInit, GatewayInitRequest, GatewayStatus, GatewayVerification, PaymentGateway},
};

pub struct StripeGateway {
    client: Client,
}

/// Checkout events the marketplace reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripeWebhookEvent {
    SessionCompleted(String),
    SessionExpired(String),
    Ignored,
}

impl StripeGateway {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(api_key),
        }
    }
}

fn to_stripe_currency(code: &str) -> Result<Currency> {
    serde_json::from_value(serde_json::Value::String(code.to_lowercase()))
        .map_err(|_| AppError::BadRequest(format!("Stripe does not support currency {}", code)))
}

fn from_stripe_currency(currency: Option<Currency>) -> String {
    currency
        .and_then(|c| serde_json::to_value(c).ok())
        .and_then(|v| v.as_str().map(str::to_uppercase))
        .unwrap_or_default()
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Stripe
    }

    async fn initialize(&self, request: &GatewayInitRequest) -> Result<GatewayInit> {
        let currency = to_stripe_currency(&request.currency)?;
        let order_id_str = request.order_id.to_string();
        let success_url = format!("{}?order_id={}&provider=stripe", request.callback_url, order_id_str);
        let cancel_url = format!("{}?order_id={}&cancelled=true", request.callback_url, order_id_str);

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.success_url = Some(&success_url);
        params.cancel_url = Some(&cancel_url);
        params.customer_email = Some(&request.payer_email);
        params.client_reference_id = Some(&order_id_str);

        // Inline price data; projects are not mirrored as Stripe products
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price_data: Some(stripe::CreateCheckoutSessionLineItemsPriceData {
                currency,
                unit_amount: Some(request.amount_minor),
                product_data: Some(stripe::CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.description.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            quantity: Some(1),
            ..Default::default()
        }]);

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("order_id".to_string(), order_id_str.clone());
        params.metadata = Some(metadata);

        let session = CheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| AppError::External(format!("Stripe error: {}", e)))?;

        let payment_url = session
            .url
            .ok_or_else(|| AppError::External("No checkout URL returned".to_string()))?;

        Ok(GatewayInit {
            reference: session.id.to_string(),
            payment_url,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification> {
        let session_id: CheckoutSessionId = reference
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid Stripe session id: {}", reference)))?;

        let session = CheckoutSession::retrieve(&self.client, &session_id, &[])
            .await
            .map_err(|e| AppError::External(format!("Stripe error: {}", e)))?;

        let status = match session.payment_status {
            CheckoutSessionPaymentStatus::Paid => GatewayStatus::Success,
            CheckoutSessionPaymentStatus::Unpaid => GatewayStatus::Pending,
            _ => GatewayStatus::Failed,
        };

        let raw = serde_json::to_value(&session)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(GatewayVerification {
            reference: session.id.to_string(),
            status,
            amount_minor: session.amount_total.unwrap_or_default(),
            currency: from_stripe_currency(session.currency),
            raw,
        })
    }
}

/// Verifies the `Stripe-Signature` header and extracts the checkout event.
pub fn parse_webhook_event(
    payload: &str,
    stripe_signature: &str,
    webhook_secret: &str,
) -> Result<StripeWebhookEvent> {
    let event = Webhook::construct_event(payload, stripe_signature, webhook_secret)
        .map_err(|e| match e {
            WebhookError::BadSignature => AppError::BadRequest("Invalid signature".to_string()),
            _ => AppError::External(format!("Webhook error: {}", e)),
        })?;

    let parsed = match (event.type_, event.data.object) {
        (EventType::CheckoutSessionCompleted, EventObject::CheckoutSession(session)) => {
            StripeWebhookEvent::SessionCompleted(session.id.to_string())
        }
        (EventType::CheckoutSessionAsyncPaymentSucceeded, EventObject::CheckoutSession(session)) => {
            StripeWebhookEvent::SessionCompleted(session.id.to_string())
        }
        (EventType::CheckoutSessionExpired, EventObject::CheckoutSession(session)) => {
            StripeWebhookEvent::SessionExpired(session.id.to_string())
        }
        (other, _) => {
            tracing::debug!("Unhandled webhook event type: {:?}", other);
            StripeWebhookEvent::Ignored
        }
    };

    Ok(parsed)
}
