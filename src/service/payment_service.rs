use std::sync::Arc;
use uuid::Uuid;

use crate::{
    currency::CurrencyService,
    domain::*,
    error::{AppError, Result},
    payments::{GatewayInitRequest, GatewayRegistry, GatewayStatus, GatewayVerification},
    repository::{OrderRepository, ProjectRepository},
    service::notification_service::NotificationService,
};

/// Checkout and settlement. Every verified payment ends in one call to
/// `OrderRepository::settle`, which is conditional on the order still
/// being pending.
pub struct PaymentService {
    order_repo: Arc<dyn OrderRepository>,
    project_repo: Arc<dyn ProjectRepository>,
    gateways: Arc<GatewayRegistry>,
    currency: Arc<CurrencyService>,
    notifications: Arc<NotificationService>,
    callback_url: String,
}

impl PaymentService {
    pub fn new(
        order_repo: Arc<dyn OrderRepository>,
        project_repo: Arc<dyn ProjectRepository>,
        gateways: Arc<GatewayRegistry>,
        currency: Arc<CurrencyService>,
        notifications: Arc<NotificationService>,
        callback_url: String,
    ) -> Self {
        Self {
            order_repo,
            project_repo,
            gateways,
            currency,
            notifications,
            callback_url,
        }
    }

    pub fn available_methods(&self) -> Vec<PaymentMethod> {
        self.gateways.methods()
    }

    pub async fn initialize_payment(
        &self,
        buyer_id: Uuid,
        request: InitializePaymentRequest,
    ) -> Result<PaymentInitialization> {
        let project = self
            .project_repo
            .find_by_id(request.project_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

        let amount_minor = project.price_minor;
        let currency = project.currency.to_uppercase();

        if amount_minor <= 0 {
            return Err(AppError::Validation("Amount must be greater than zero".to_string()));
        }
        if !is_supported_currency(&currency) {
            return Err(AppError::Validation(format!("Unsupported currency: {}", currency)));
        }
        if project.creator_id == buyer_id {
            return Err(AppError::BadRequest("You cannot buy your own project".to_string()));
        }

        let gateway = self.gateways.get(request.payment_method)?;

        // Paystack settles in NGN here, so USD prices are charged in kobo
        let conversion = if request.payment_method == PaymentMethod::Paystack && currency == "USD" {
            let converted = self.currency.convert_usd_to_ngn(amount_minor).await;
            Some(CurrencyConversion {
                original_amount_minor: amount_minor,
                original_currency: currency.clone(),
                converted_amount_minor: converted.ngn_amount_minor,
                converted_currency: "NGN".to_string(),
                exchange_rate: converted.exchange_rate,
                converted_at: converted.converted_at,
            })
        } else {
            None
        };

        let order = self
            .order_repo
            .create(NewOrder {
                project_id: project.id,
                buyer_id,
                creator_id: project.creator_id,
                buyer_email: request.buyer_email.clone(),
                buyer_name: request.buyer_name.clone(),
                amount_minor,
                currency: currency.clone(),
                payment_method: request.payment_method,
                metadata: OrderMetadata {
                    conversion: conversion.clone(),
                    gateway_response: None,
                },
            })
            .await?;

        let (charge_amount, charge_currency) = order.charge_intent();
        let init_request = GatewayInitRequest {
            order_id: order.id,
            payer_email: request.buyer_email,
            amount_minor: charge_amount,
            currency: charge_currency.to_string(),
            description: project.title.clone(),
            callback_url: self.callback_url.clone(),
        };

        let init = match gateway.initialize(&init_request).await {
            Ok(init) => init,
            Err(e) => {
                // The order stays pending; the buyer may retry or abandon it
                tracing::warn!(
                    order_id = %order.id,
                    method = request.payment_method.as_str(),
                    "Payment initialization failed: {}",
                    e
                );
                return Err(e);
            }
        };

        self.order_repo.attach_reference(order.id, &init.reference).await?;

        tracing::info!(
            order_id = %order.id,
            reference = %init.reference,
            method = request.payment_method.as_str(),
            "Payment initialized"
        );

        Ok(PaymentInitialization {
            order_id: order.id,
            reference: init.reference,
            payment_url: init.payment_url,
            amount_minor: charge_amount,
            currency: charge_currency.to_string(),
            conversion,
        })
    }

    /// Confirms the payment with the gateway and settles the order. Safe to
    /// call repeatedly: once the order is completed later calls are no-ops.
    pub async fn verify_payment(
        &self,
        order_id: Uuid,
        reference: Option<&str>,
    ) -> Result<PaymentVerification> {
        let order = self.find_order(order_id).await?;

        // Only the reference the gateway issued for this order is accepted
        let Some(stored) = order.payment_reference.as_deref() else {
            return Err(AppError::BadRequest("Order has no payment reference".to_string()));
        };
        if reference.is_some_and(|given| given != stored) {
            return Err(AppError::BadRequest(
                "Payment reference does not match order".to_string(),
            ));
        }
        let reference = stored.to_string();

        match order.status {
            OrderStatus::Completed => {
                tracing::debug!(order_id = %order.id, "Order already settled");
                return Ok(PaymentVerification {
                    order,
                    newly_settled: false,
                });
            }
            OrderStatus::Failed => {
                return Err(AppError::Conflict("Order is no longer payable".to_string()));
            }
            OrderStatus::Pending => {}
        }

        let gateway = self.gateways.get(order.payment_method)?;
        let verification = gateway.verify(&reference).await?;

        match verification.status {
            GatewayStatus::Success => {}
            GatewayStatus::Pending => {
                return Err(AppError::Payment("Payment is still pending".to_string()))
            }
            GatewayStatus::Failed => {
                return Err(AppError::Payment("Payment was not successful".to_string()))
            }
        }

        reconcile(&order, &verification)?;

        let settlement = Settlement::for_order(&order, &reference, verification.raw);
        let outcome = self.order_repo.settle(&settlement).await?;

        if outcome == SettlementOutcome::Settled {
            tracing::info!(
                order_id = %order.id,
                reference = %reference,
                creator_id = %order.creator_id,
                net_minor = settlement.fees.net_amount_minor,
                "Order settled"
            );
            self.dispatch_notifications(&order, &settlement).await;
        } else {
            tracing::debug!(order_id = %order.id, "Concurrent settlement already completed order");
        }

        let order = self.find_order(order_id).await?;
        Ok(PaymentVerification {
            order,
            newly_settled: outcome == SettlementOutcome::Settled,
        })
    }

    /// Webhook entry point: settle whichever order carries `reference`.
    /// `None` means no order was issued that reference.
    pub async fn settle_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentVerification>> {
        let Some(order) = self.order_repo.find_by_reference(reference).await? else {
            return Ok(None);
        };

        self.verify_payment(order.id, Some(reference)).await.map(Some)
    }

    /// Marks an abandoned checkout as failed. Settled orders are untouched.
    pub async fn fail_by_reference(&self, reference: &str) -> Result<bool> {
        let Some(order) = self.order_repo.find_by_reference(reference).await? else {
            return Ok(false);
        };

        if !order.is_pending() {
            return Ok(false);
        }

        let failed = self.order_repo.mark_failed(order.id).await?;
        if failed {
            tracing::info!(order_id = %order.id, reference, "Order marked failed");
        }
        Ok(failed)
    }

    /// Buyer or creator only.
    pub async fn get_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Order> {
        let order = self.find_order(order_id).await?;
        if order.buyer_id != user_id && order.creator_id != user_id {
            return Err(AppError::Forbidden);
        }
        Ok(order)
    }

    pub async fn list_orders(&self, buyer_id: Uuid) -> Result<Vec<Order>> {
        self.order_repo.list_by_buyer(buyer_id).await
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Order> {
        self.order_repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
    }

    async fn dispatch_notifications(&self, order: &Order, settlement: &Settlement) {
        let project = match self.project_repo.find_by_id(order.project_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                tracing::warn!(order_id = %order.id, "Project vanished before notifications were sent");
                return;
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id, "Failed to load project for notifications: {}", e);
                return;
            }
        };

        let ctx = PaymentNotificationContext {
            order_id: order.id,
            project_id: project.id,
            project_title: project.title,
            buyer_id: order.buyer_id,
            buyer_name: order.buyer_name.clone(),
            creator_id: order.creator_id,
            creator_name: project.creator_name,
            amount_minor: order.amount_minor,
            currency: order.currency.clone(),
            net_amount_minor: settlement.fees.net_amount_minor,
        };

        self.notifications.create_payment_notifications(&ctx).await;
    }
}

/// The gateway must report exactly what the order asked it to charge.
fn reconcile(order: &Order, verification: &GatewayVerification) -> Result<()> {
    let (expected_amount, expected_currency) = order.charge_intent();

    if verification.amount_minor != expected_amount
        || !verification.currency.eq_ignore_ascii_case(expected_currency)
    {
        tracing::warn!(
            order_id = %order.id,
            expected_amount,
            expected_currency,
            verified_amount = verification.amount_minor,
            verified_currency = %verification.currency,
            "Verified payment does not match charge intent"
        );
        return Err(AppError::Payment(
            "Verified payment does not match the order amount".to_string(),
        ));
    }

    Ok(())
}
