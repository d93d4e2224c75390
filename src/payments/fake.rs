use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::{
    domain::PaymentMethod,
    error::{AppError, Result},
    payments::{GatewayInit, GatewayInitRequest, GatewayStatus, GatewayVerification, PaymentGateway},
};

#[derive(Default)]
struct FakeState {
    initialized: Vec<GatewayInitRequest>,
    charges: HashMap<String, (i64, String)>,
    verify_calls: usize,
    outcome: Option<GatewayStatus>,
    verified_amount_override: Option<i64>,
    initialize_error: Option<String>,
}

/// In-memory gateway that records what it was asked to charge and answers
/// verification from those records. Used by tests and local development.
pub struct FakeGateway {
    method: PaymentMethod,
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            state: Mutex::new(FakeState {
                outcome: Some(GatewayStatus::Success),
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        // A panicked test thread must not hide later assertions
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Status every later verification reports.
    pub fn set_outcome(&self, status: GatewayStatus) {
        self.state().outcome = Some(status);
    }

    /// Report a different charged amount than was requested.
    pub fn set_verified_amount(&self, amount_minor: i64) {
        self.state().verified_amount_override = Some(amount_minor);
    }

    pub fn fail_initialize(&self, message: &str) {
        self.state().initialize_error = Some(message.to_string());
    }

    pub fn initialized(&self) -> Vec<GatewayInitRequest> {
        self.state().initialized.clone()
    }

    pub fn verify_calls(&self) -> usize {
        self.state().verify_calls
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn method(&self) -> PaymentMethod {
        self.method
    }

    async fn initialize(&self, request: &GatewayInitRequest) -> Result<GatewayInit> {
        let mut state = self.state();
        if let Some(message) = state.initialize_error.clone() {
            return Err(AppError::Payment(message));
        }

        let reference = format!("fake_{}_{}", self.method.as_str(), request.order_id.simple());
        state.initialized.push(request.clone());
        state
            .charges
            .insert(reference.clone(), (request.amount_minor, request.currency.clone()));

        Ok(GatewayInit {
            payment_url: format!("https://checkout.invalid/{}", reference),
            reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification> {
        let mut state = self.state();
        state.verify_calls += 1;

        let (amount_minor, currency) = state
            .charges
            .get(reference)
            .cloned()
            .ok_or_else(|| AppError::Payment(format!("Unknown transaction reference: {}", reference)))?;

        let status = state.outcome.unwrap_or(GatewayStatus::Success);
        let amount_minor = state.verified_amount_override.unwrap_or(amount_minor);

        Ok(GatewayVerification {
            reference: reference.to_string(),
            status,
            amount_minor,
            currency: currency.clone(),
            raw: serde_json::json!({
                "reference": reference,
                "status": status,
                "amount": amount_minor,
                "currency": currency,
            }),
        })
    }
}
