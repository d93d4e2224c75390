use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::{
    api::state::AppState,
    error::{AppError, Result},
    payments::{
        stripe_client::{parse_webhook_event, StripeWebhookEvent},
        webhook::{verify_flutterwave_hash, verify_paystack_signature, FlutterwaveEvent, PaystackEvent},
    },
};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("Missing {} header", name)))
}

fn received() -> Json<Value> {
    Json(json!({ "success": true, "received": true }))
}

/// Settles the order behind `reference`. Unknown references are
/// acknowledged so the provider stops redelivering; every other failure is
/// returned so it retries.
async fn settle(state: &AppState, provider: &str, reference: &str) -> Result<()> {
    match state
        .service_context
        .payment_service
        .settle_by_reference(reference)
        .await
    {
        Ok(Some(result)) => {
            tracing::info!(
                provider,
                reference,
                order_id = %result.order.id,
                newly_settled = result.newly_settled,
                "Webhook settlement processed"
            );
            Ok(())
        }
        Ok(None) => {
            tracing::warn!(provider, reference, "Webhook for unknown payment reference");
            Ok(())
        }
        Err(e) => {
            tracing::error!(provider, reference, "Webhook settlement failed: {}", e);
            Err(e)
        }
    }
}

pub async fn paystack(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let secret = state
        .settings
        .payments
        .paystack
        .secret_key
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Paystack is not configured".to_string()))?;

    let signature = header(&headers, "x-paystack-signature")?;
    if !verify_paystack_signature(secret, &body, signature) {
        tracing::warn!("Rejected Paystack webhook with invalid signature");
        return Err(AppError::Unauthorized);
    }

    let event: PaystackEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    if event.is_successful_charge() {
        settle(&state, "paystack", &event.data.reference).await?;
    } else {
        tracing::debug!(event = %event.event, "Ignoring Paystack event");
    }

    Ok(received())
}

pub async fn flutterwave(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let expected = state
        .settings
        .payments
        .flutterwave
        .webhook_hash
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Flutterwave webhooks are not configured".to_string()))?;

    let received_hash = header(&headers, "verif-hash")?;
    if !verify_flutterwave_hash(expected, received_hash) {
        tracing::warn!("Rejected Flutterwave webhook with invalid hash");
        return Err(AppError::Unauthorized);
    }

    let event: FlutterwaveEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    if event.is_successful_charge() {
        settle(&state, "flutterwave", &event.data.tx_ref).await?;
    } else {
        tracing::debug!(event = %event.event, status = %event.data.status, "Ignoring Flutterwave event");
    }

    Ok(received())
}

pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>> {
    let secret = state
        .settings
        .payments
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Stripe webhooks are not configured".to_string()))?;

    let signature = header(&headers, "stripe-signature")?;

    match parse_webhook_event(&body, signature, secret)? {
        StripeWebhookEvent::SessionCompleted(session_id) => {
            settle(&state, "stripe", &session_id).await?;
        }
        StripeWebhookEvent::SessionExpired(session_id) => {
            state
                .service_context
                .payment_service
                .fail_by_reference(&session_id)
                .await?;
        }
        StripeWebhookEvent::Ignored => {}
    }

    Ok(received())
}
