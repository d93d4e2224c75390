mod common;

use common::{checkout, concurrent_harness, create_project, harness, TEST_RATE};
use scholarmart::{
    domain::{EarningsStatus, NotificationType, OrderStatus, PaymentMethod},
    error::AppError,
    payments::GatewayStatus,
    repository::{EarningsRepository, OrderRepository, ProjectRepository, PurchaseRepository},
};
use uuid::Uuid;

#[tokio::test]
async fn test_settlement_end_to_end() -> anyhow::Result<()> {
    let h = harness().await?;
    let creator_id = Uuid::new_v4();
    let buyer_id = Uuid::new_v4();

    let project = create_project(&h, creator_id, 10_000, "USD").await?;
    let init = checkout(&h, buyer_id, project.id, PaymentMethod::Stripe).await?;
    assert!(init.conversion.is_none());

    let pending = h.ctx.order_repo.find_by_id(init.order_id).await?.unwrap();
    assert_eq!(pending.status, OrderStatus::Pending);
    assert_eq!(pending.payment_reference.as_deref(), Some(init.reference.as_str()));

    let result = h
        .ctx
        .payment_service
        .verify_payment(init.order_id, Some(&init.reference))
        .await?;
    assert!(result.newly_settled);
    assert_eq!(result.order.status, OrderStatus::Completed);
    assert!(result.order.completed_at.is_some());
    assert!(result.order.metadata.gateway_response.is_some());

    // Fee breakdown for $100.00
    let earnings = h.ctx.earnings_repo.find_by_order(init.order_id).await?.unwrap();
    assert_eq!(earnings.gross_amount_minor, 10_000);
    assert_eq!(earnings.platform_fee_minor, 1_500);
    assert_eq!(earnings.payment_fee_minor, 290);
    assert_eq!(earnings.net_amount_minor, 8_210);
    assert_eq!(earnings.status, EarningsStatus::Available);
    assert_eq!(earnings.creator_id, creator_id);

    // Project aggregates
    let project_after = h.ctx.project_repo.find_by_id(project.id).await?.unwrap();
    assert_eq!(project_after.total_purchases, project.total_purchases + 1);
    assert_eq!(project_after.total_revenue_minor, project.total_revenue_minor + 10_000);

    // Exactly one purchase granting access
    let purchase = h.ctx.purchase_repo.find_by_order(init.order_id).await?.unwrap();
    assert!(purchase.access_granted);
    assert_eq!(purchase.project_id, project.id);
    assert_eq!(purchase.buyer_id, buyer_id);
    assert_eq!(purchase.download_count, 0);
    assert_eq!(purchase.download_url, format!("/api/download/{}", project.id));
    assert_eq!(h.ctx.purchase_repo.count_by_order(init.order_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_repeated_verification_settles_once() -> anyhow::Result<()> {
    let h = harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 2_500, "USD").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Paypal).await?;

    let first = h.ctx.payment_service.verify_payment(init.order_id, None).await?;
    let second = h.ctx.payment_service.verify_payment(init.order_id, None).await?;
    // Webhook redelivery goes through the reference lookup
    let third = h.ctx.payment_service.settle_by_reference(&init.reference).await?.unwrap();

    assert!(first.newly_settled);
    assert!(!second.newly_settled);
    assert!(!third.newly_settled);
    assert_eq!(third.order.status, OrderStatus::Completed);

    assert_eq!(h.ctx.purchase_repo.count_by_order(init.order_id).await?, 1);
    assert_eq!(h.ctx.earnings_repo.count_by_order(init.order_id).await?, 1);

    let project_after = h.ctx.project_repo.find_by_id(project.id).await?.unwrap();
    assert_eq!(project_after.total_purchases, 1);
    assert_eq!(project_after.total_revenue_minor, 2_500);

    // A settled order is not re-verified with the gateway
    assert_eq!(h.gateway(PaymentMethod::Paypal).verify_calls(), 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_verification_settles_once() -> anyhow::Result<()> {
    let h = concurrent_harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 4_000, "USD").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Flutterwave).await?;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let payments = h.ctx.payment_service.clone();
            let order_id = init.order_id;
            let reference = init.reference.clone();
            tokio::spawn(async move { payments.verify_payment(order_id, Some(&reference)).await })
        })
        .collect();

    let mut settled = 0;
    for task in tasks {
        if task.await??.newly_settled {
            settled += 1;
        }
    }

    assert_eq!(settled, 1);
    assert_eq!(h.ctx.purchase_repo.count_by_order(init.order_id).await?, 1);
    assert_eq!(h.ctx.earnings_repo.count_by_order(init.order_id).await?, 1);

    let project_after = h.ctx.project_repo.find_by_id(project.id).await?.unwrap();
    assert_eq!(project_after.total_purchases, 1);
    assert_eq!(project_after.total_revenue_minor, 4_000);

    Ok(())
}

#[tokio::test]
async fn test_failed_commit_leaves_no_partial_state() -> anyhow::Result<()> {
    let h = harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 10_000, "USD").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Stripe).await?;

    // The earnings insert is the last write in the settlement transaction
    sqlx::query(
        r#"
        CREATE TRIGGER fail_earnings BEFORE INSERT ON creator_earnings
        BEGIN
            SELECT RAISE(ABORT, 'simulated commit failure');
        END
        "#,
    )
    .execute(&h.pool)
    .await?;

    let result = h.ctx.payment_service.verify_payment(init.order_id, None).await;
    assert!(matches!(result, Err(AppError::Database(_))));

    let order = h.ctx.order_repo.find_by_id(init.order_id).await?.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.completed_at.is_none());
    assert_eq!(h.ctx.purchase_repo.count_by_order(init.order_id).await?, 0);
    assert_eq!(h.ctx.earnings_repo.count_by_order(init.order_id).await?, 0);

    let project_after = h.ctx.project_repo.find_by_id(project.id).await?.unwrap();
    assert_eq!(project_after.total_purchases, 0);
    assert_eq!(project_after.total_revenue_minor, 0);

    // Retrying once the fault is gone settles normally
    sqlx::query("DROP TRIGGER fail_earnings").execute(&h.pool).await?;
    let retry = h.ctx.payment_service.verify_payment(init.order_id, None).await?;
    assert!(retry.newly_settled);
    assert_eq!(h.ctx.purchase_repo.count_by_order(init.order_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_unsuccessful_verification_leaves_order_pending() -> anyhow::Result<()> {
    let h = harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 3_000, "USD").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Stripe).await?;

    h.gateway(PaymentMethod::Stripe).set_outcome(GatewayStatus::Failed);
    let result = h.ctx.payment_service.verify_payment(init.order_id, None).await;
    assert!(matches!(result, Err(AppError::Payment(_))));

    h.gateway(PaymentMethod::Stripe).set_outcome(GatewayStatus::Pending);
    let result = h.ctx.payment_service.verify_payment(init.order_id, None).await;
    assert!(matches!(result, Err(AppError::Payment(_))));

    let order = h.ctx.order_repo.find_by_id(init.order_id).await?.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(h.ctx.purchase_repo.count_by_order(init.order_id).await?, 0);

    // The buyer may retry once the gateway confirms
    h.gateway(PaymentMethod::Stripe).set_outcome(GatewayStatus::Success);
    let result = h.ctx.payment_service.verify_payment(init.order_id, None).await?;
    assert!(result.newly_settled);

    Ok(())
}

#[tokio::test]
async fn test_amount_mismatch_is_rejected() -> anyhow::Result<()> {
    let h = harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 3_000, "USD").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Paypal).await?;

    h.gateway(PaymentMethod::Paypal).set_verified_amount(100);
    let result = h.ctx.payment_service.verify_payment(init.order_id, None).await;
    assert!(matches!(result, Err(AppError::Payment(_))));

    let order = h.ctx.order_repo.find_by_id(init.order_id).await?.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(h.ctx.earnings_repo.count_by_order(init.order_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_mismatched_reference_is_rejected() -> anyhow::Result<()> {
    let h = harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 3_000, "USD").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Stripe).await?;

    let result = h
        .ctx
        .payment_service
        .verify_payment(init.order_id, Some("someone_elses_reference"))
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(h.gateway(PaymentMethod::Stripe).verify_calls(), 0);

    Ok(())
}

#[tokio::test]
async fn test_paystack_usd_is_charged_in_ngn() -> anyhow::Result<()> {
    let h = harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 5_000, "USD").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Paystack).await?;

    // $50 at 1600 NGN/USD, in kobo
    let calls = h.gateway(PaymentMethod::Paystack).initialized();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].amount_minor, 50 * 1600 * 100);
    assert_eq!(calls[0].currency, "NGN");
    assert_eq!(init.amount_minor, 8_000_000);
    assert_eq!(init.currency, "NGN");

    let order = h.ctx.order_repo.find_by_id(init.order_id).await?.unwrap();
    assert_eq!(order.amount_minor, 5_000);
    assert_eq!(order.currency, "USD");
    let conversion = order.metadata.conversion.clone().unwrap();
    assert_eq!(conversion.exchange_rate, TEST_RATE);
    assert_eq!(conversion.original_amount_minor, 5_000);
    assert_eq!(conversion.original_currency, "USD");
    assert_eq!(conversion.converted_amount_minor, 8_000_000);
    assert_eq!(conversion.converted_currency, "NGN");

    // Verification reconciles against the kobo amount; earnings stay in USD
    h.ctx.payment_service.verify_payment(init.order_id, None).await?;
    let earnings = h.ctx.earnings_repo.find_by_order(init.order_id).await?.unwrap();
    assert_eq!(earnings.currency, "USD");
    assert_eq!(earnings.gross_amount_minor, 5_000);

    let settled = h.ctx.order_repo.find_by_id(init.order_id).await?.unwrap();
    assert_eq!(settled.metadata.conversion, order.metadata.conversion);

    Ok(())
}

#[tokio::test]
async fn test_paystack_ngn_is_not_converted() -> anyhow::Result<()> {
    let h = harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 2_000_000, "NGN").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Paystack).await?;

    assert!(init.conversion.is_none());
    let calls = h.gateway(PaymentMethod::Paystack).initialized();
    assert_eq!(calls[0].amount_minor, 2_000_000);
    assert_eq!(calls[0].currency, "NGN");

    Ok(())
}

#[tokio::test]
async fn test_gateway_failure_leaves_pending_order() -> anyhow::Result<()> {
    let h = harness().await?;
    let buyer_id = Uuid::new_v4();
    let project = create_project(&h, Uuid::new_v4(), 3_000, "USD").await?;

    h.gateway(PaymentMethod::Flutterwave).fail_initialize("Invalid merchant credentials");
    let result = checkout(&h, buyer_id, project.id, PaymentMethod::Flutterwave).await;
    let err = result.unwrap_err().downcast::<AppError>()?;
    assert!(matches!(err, AppError::Payment(ref msg) if msg == "Invalid merchant credentials"));

    let orders = h.ctx.order_repo.list_by_buyer(buyer_id).await?;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert!(orders[0].payment_reference.is_none());

    Ok(())
}

#[tokio::test]
async fn test_order_without_reference_cannot_be_verified() -> anyhow::Result<()> {
    let h = harness().await?;
    let buyer_id = Uuid::new_v4();
    let project = create_project(&h, Uuid::new_v4(), 3_000, "USD").await?;

    h.gateway(PaymentMethod::Paypal).fail_initialize("Gateway timeout");
    assert!(checkout(&h, buyer_id, project.id, PaymentMethod::Paypal).await.is_err());
    let order = h.ctx.order_repo.list_by_buyer(buyer_id).await?.remove(0);

    // A reference issued for some other payment must not settle this order
    let other_project = create_project(&h, Uuid::new_v4(), 3_000, "USD").await?;
    let other = checkout(&h, Uuid::new_v4(), other_project.id, PaymentMethod::Stripe).await?;

    for reference in [Some(other.reference.as_str()), None] {
        let result = h.ctx.payment_service.verify_payment(order.id, reference).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
    assert_eq!(h.gateway(PaymentMethod::Paypal).verify_calls(), 0);
    assert_eq!(h.ctx.purchase_repo.count_by_order(order.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_missing_project_is_not_reported_as_unknown_reference() -> anyhow::Result<()> {
    let h = harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 3_000, "USD").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Stripe).await?;

    sqlx::query("PRAGMA foreign_keys = OFF").execute(&h.pool).await?;
    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(project.id.to_string())
        .execute(&h.pool)
        .await?;

    let result = h.ctx.payment_service.settle_by_reference(&init.reference).await;
    assert!(matches!(result, Err(AppError::Internal(_))));

    let order = h.ctx.order_repo.find_by_id(init.order_id).await?.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(h.ctx.purchase_repo.count_by_order(init.order_id).await?, 0);

    assert!(h
        .ctx
        .payment_service
        .settle_by_reference("never_issued")
        .await?
        .is_none());

    Ok(())
}

#[tokio::test]
async fn test_initialize_rejects_missing_project() -> anyhow::Result<()> {
    let h = harness().await?;
    let result = checkout(&h, Uuid::new_v4(), Uuid::new_v4(), PaymentMethod::Stripe).await;
    let err = result.unwrap_err().downcast::<AppError>()?;
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Project not found"));
    Ok(())
}

#[tokio::test]
async fn test_expired_checkout_cannot_settle() -> anyhow::Result<()> {
    let h = harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 3_000, "USD").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Stripe).await?;

    assert!(h.ctx.payment_service.fail_by_reference(&init.reference).await?);
    assert!(!h.ctx.payment_service.fail_by_reference(&init.reference).await?);

    let result = h.ctx.payment_service.verify_payment(init.order_id, None).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(h.ctx.purchase_repo.count_by_order(init.order_id).await?, 0);

    // A late expiry does not touch a completed order
    let paid = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Stripe).await?;
    h.ctx.payment_service.verify_payment(paid.order_id, None).await?;
    assert!(!h.ctx.payment_service.fail_by_reference(&paid.reference).await?);
    let order = h.ctx.order_repo.find_by_id(paid.order_id).await?.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);

    Ok(())
}

#[tokio::test]
async fn test_settlement_notifies_buyer_and_creator() -> anyhow::Result<()> {
    let h = harness().await?;
    let creator_id = Uuid::new_v4();
    let buyer_id = Uuid::new_v4();
    let project = create_project(&h, creator_id, 10_000, "USD").await?;
    let init = checkout(&h, buyer_id, project.id, PaymentMethod::Stripe).await?;

    h.ctx.payment_service.verify_payment(init.order_id, None).await?;
    // A repeat verification must not notify again
    h.ctx.payment_service.verify_payment(init.order_id, None).await?;

    let buyer_notes = h.ctx.notification_service.list(buyer_id, false).await?;
    assert_eq!(buyer_notes.len(), 1);
    assert_eq!(buyer_notes[0].kind, NotificationType::PaymentSent);
    assert!(buyer_notes[0].message.contains("USD 100.00"));

    let creator_notes = h.ctx.notification_service.list(creator_id, true).await?;
    assert_eq!(creator_notes.len(), 2);
    let kinds: Vec<_> = creator_notes.iter().map(|n| n.kind).collect();
    assert!(kinds.contains(&NotificationType::PaymentReceived));
    assert!(kinds.contains(&NotificationType::ProjectPurchased));
    assert!(creator_notes
        .iter()
        .any(|n| n.message.contains("USD 82.10")));

    assert_eq!(h.ctx.notification_service.mark_all_read(creator_id).await?, 2);
    assert!(h.ctx.notification_service.list(creator_id, true).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_notification_failure_does_not_undo_settlement() -> anyhow::Result<()> {
    let h = harness().await?;
    let project = create_project(&h, Uuid::new_v4(), 10_000, "USD").await?;
    let init = checkout(&h, Uuid::new_v4(), project.id, PaymentMethod::Stripe).await?;

    sqlx::query("DROP TABLE notifications").execute(&h.pool).await?;

    let result = h.ctx.payment_service.verify_payment(init.order_id, None).await?;
    assert!(result.newly_settled);
    assert_eq!(result.order.status, OrderStatus::Completed);
    assert_eq!(h.ctx.purchase_repo.count_by_order(init.order_id).await?, 1);

    Ok(())
}
