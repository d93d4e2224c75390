mod common;

use common::{checkout, concurrent_harness, create_project, harness, Harness};
use scholarmart::{
    domain::{
        BankDetails, CreateBankDetailsRequest, CreatorBalance, NotificationType, PaymentMethod,
        WithdrawalRequest, WithdrawalStatus,
    },
    error::AppError,
};
use uuid::Uuid;

/// Settles one $100 sale for `creator_id`, crediting 8210 cents.
async fn earn(h: &Harness, creator_id: Uuid) -> anyhow::Result<()> {
    let project = create_project(h, creator_id, 10_000, "USD").await?;
    let init = checkout(h, Uuid::new_v4(), project.id, PaymentMethod::Stripe).await?;
    h.ctx.payment_service.verify_payment(init.order_id, None).await?;
    Ok(())
}

async fn verified_account(h: &Harness, creator_id: Uuid) -> anyhow::Result<BankDetails> {
    let details = h
        .ctx
        .earnings_service
        .add_bank_details(
            creator_id,
            CreateBankDetailsRequest {
                bank_name: "First Bank".to_string(),
                account_name: "Ada Creator".to_string(),
                account_number: "0123 4567 89".to_string(),
            },
        )
        .await?;
    Ok(h.ctx.earnings_service.verify_bank_details(details.id).await?)
}

fn withdraw(amount_minor: i64, bank_details_id: Uuid) -> WithdrawalRequest {
    WithdrawalRequest {
        amount_minor,
        bank_details_id,
        currency: Some("USD".to_string()),
        note: None,
    }
}

#[tokio::test]
async fn test_balance_reflects_settled_earnings() -> anyhow::Result<()> {
    let h = harness().await?;
    let creator_id = Uuid::new_v4();

    let empty = h.ctx.earnings_service.balance(creator_id, None).await;
    assert_eq!(empty.currency, "USD");
    assert_eq!(empty.available_minor, 0);
    assert_eq!(empty.withdrawable_minor, 0);

    earn(&h, creator_id).await?;
    earn(&h, creator_id).await?;

    let balance = h.ctx.earnings_service.balance(creator_id, Some("usd")).await;
    assert_eq!(balance.available_minor, 16_420);
    assert_eq!(balance.total_minor, 16_420);
    assert_eq!(balance.pending_withdrawals_minor, 0);
    assert_eq!(balance.withdrawable_minor, 16_420);

    // Balances are per currency
    let ngn = h.ctx.earnings_service.balance(creator_id, Some("NGN")).await;
    assert_eq!(ngn.available_minor, 0);

    assert_eq!(h.ctx.earnings_service.list_earnings(creator_id).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_withdrawal_bounds() -> anyhow::Result<()> {
    let h = harness().await?;
    let creator_id = Uuid::new_v4();
    earn(&h, creator_id).await?;
    let account = verified_account(&h, creator_id).await?;
    let earnings = &h.ctx.earnings_service;

    let zero = earnings.request_withdrawal(creator_id, withdraw(0, account.id)).await;
    assert!(matches!(zero, Err(AppError::Validation(_))));

    let negative = earnings.request_withdrawal(creator_id, withdraw(-100, account.id)).await;
    assert!(matches!(negative, Err(AppError::Validation(_))));

    let too_much = earnings.request_withdrawal(creator_id, withdraw(8_211, account.id)).await;
    assert!(matches!(too_much, Err(AppError::Validation(ref msg)) if msg == "Insufficient balance"));

    // Rejected requests leave no record behind
    assert!(earnings.list_withdrawals(creator_id).await?.is_empty());

    let exact = earnings.request_withdrawal(creator_id, withdraw(8_210, account.id)).await?;
    assert_eq!(exact.status, WithdrawalStatus::Pending);
    assert_eq!(exact.currency, "USD");

    // Nothing left once the full balance is committed
    let again = earnings.request_withdrawal(creator_id, withdraw(1, account.id)).await;
    assert!(matches!(again, Err(AppError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_withdrawals_stay_within_balance() -> anyhow::Result<()> {
    let h = concurrent_harness().await?;
    let creator_id = Uuid::new_v4();
    earn(&h, creator_id).await?;
    let account = verified_account(&h, creator_id).await?;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let earnings = h.ctx.earnings_service.clone();
            let request = withdraw(5_000, account.id);
            tokio::spawn(async move { earnings.request_withdrawal(creator_id, request).await })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => accepted += 1,
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Insufficient balance"),
            Err(other) => panic!("unexpected withdrawal error: {other}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(h.ctx.earnings_service.list_withdrawals(creator_id).await?.len(), 1);

    let balance = h.ctx.earnings_service.balance(creator_id, None).await;
    assert_eq!(balance.pending_withdrawals_minor, 5_000);
    assert_eq!(balance.withdrawable_minor, 3_210);

    Ok(())
}

#[tokio::test]
async fn test_balance_read_failure_yields_zeroed_balance() -> anyhow::Result<()> {
    let h = harness().await?;
    let creator_id = Uuid::new_v4();
    earn(&h, creator_id).await?;

    sqlx::query("DROP TABLE withdrawals").execute(&h.pool).await?;

    let balance = h.ctx.earnings_service.balance(creator_id, Some("ngn")).await;
    assert_eq!(balance, CreatorBalance::zeroed("NGN"));

    let balance = h.ctx.earnings_service.balance(creator_id, None).await;
    assert_eq!(balance, CreatorBalance::zeroed("USD"));

    Ok(())
}

#[tokio::test]
async fn test_withdrawal_requires_own_verified_account() -> anyhow::Result<()> {
    let h = harness().await?;
    let creator_id = Uuid::new_v4();
    earn(&h, creator_id).await?;
    let earnings = &h.ctx.earnings_service;

    let unverified = earnings
        .add_bank_details(
            creator_id,
            CreateBankDetailsRequest {
                bank_name: "GTBank".to_string(),
                account_name: "Ada Creator".to_string(),
                account_number: "9876543210".to_string(),
            },
        )
        .await?;
    let result = earnings.request_withdrawal(creator_id, withdraw(1_000, unverified.id)).await;
    assert!(matches!(result, Err(AppError::Validation(ref msg)) if msg == "Bank account is not verified"));

    let someone_else = verified_account(&h, Uuid::new_v4()).await?;
    let result = earnings.request_withdrawal(creator_id, withdraw(1_000, someone_else.id)).await;
    assert!(matches!(result, Err(AppError::Validation(ref msg)) if msg == "Bank details not found"));

    let result = earnings.request_withdrawal(creator_id, withdraw(1_000, Uuid::new_v4())).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    assert!(earnings.list_withdrawals(creator_id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failed_withdrawal_releases_balance() -> anyhow::Result<()> {
    let h = harness().await?;
    let creator_id = Uuid::new_v4();
    earn(&h, creator_id).await?;
    let account = verified_account(&h, creator_id).await?;
    let earnings = &h.ctx.earnings_service;

    let withdrawal = earnings.request_withdrawal(creator_id, withdraw(5_000, account.id)).await?;

    let balance = earnings.balance(creator_id, None).await;
    assert_eq!(balance.available_minor, 8_210);
    assert_eq!(balance.pending_withdrawals_minor, 5_000);
    assert_eq!(balance.withdrawable_minor, 3_210);

    let processing = earnings
        .update_withdrawal_status(withdrawal.id, WithdrawalStatus::Processing)
        .await?;
    assert_eq!(processing.status, WithdrawalStatus::Processing);

    let failed = earnings
        .update_withdrawal_status(withdrawal.id, WithdrawalStatus::Failed)
        .await?;
    assert_eq!(failed.status, WithdrawalStatus::Failed);

    let balance = earnings.balance(creator_id, None).await;
    assert_eq!(balance.pending_withdrawals_minor, 0);
    assert_eq!(balance.withdrawable_minor, 8_210);

    // Terminal states do not move
    let result = earnings
        .update_withdrawal_status(withdrawal.id, WithdrawalStatus::Completed)
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let notes = h.ctx.notification_service.list(creator_id, false).await?;
    let updates = notes
        .iter()
        .filter(|n| n.kind == NotificationType::WithdrawalUpdated)
        .count();
    assert_eq!(updates, 2);

    Ok(())
}

#[tokio::test]
async fn test_completed_withdrawal_stays_committed() -> anyhow::Result<()> {
    let h = harness().await?;
    let creator_id = Uuid::new_v4();
    earn(&h, creator_id).await?;
    let account = verified_account(&h, creator_id).await?;
    let earnings = &h.ctx.earnings_service;

    let withdrawal = earnings.request_withdrawal(creator_id, withdraw(2_000, account.id)).await?;
    let completed = earnings
        .update_withdrawal_status(withdrawal.id, WithdrawalStatus::Completed)
        .await?;
    assert!(completed.processed_at.is_some());

    let balance = earnings.balance(creator_id, None).await;
    assert_eq!(balance.pending_withdrawals_minor, 0);
    assert_eq!(balance.withdrawable_minor, 6_210);

    let result = earnings
        .update_withdrawal_status(Uuid::new_v4(), WithdrawalStatus::Processing)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_bank_details_are_stored_encrypted() -> anyhow::Result<()> {
    let h = harness().await?;
    let creator_id = Uuid::new_v4();
    let earnings = &h.ctx.earnings_service;

    let details = earnings
        .add_bank_details(
            creator_id,
            CreateBankDetailsRequest {
                bank_name: "Access Bank".to_string(),
                account_name: "Ada Creator".to_string(),
                account_number: "0123 4567 89".to_string(),
            },
        )
        .await?;

    assert!(!details.is_verified);
    assert_eq!(details.account_last4, "6789");
    assert_eq!(details.masked_account_number(), "******6789");
    assert!(!details.account_number_encrypted.contains("0123456789"));

    let stored: String =
        sqlx::query_scalar("SELECT account_number_encrypted FROM bank_details WHERE id = ?")
            .bind(details.id.to_string())
            .fetch_one(&h.pool)
            .await?;
    assert!(!stored.contains("0123456789"));

    let plain = earnings.reveal_account_number(details.id).await?;
    assert_eq!(plain, "0123456789");

    let invalid = earnings
        .add_bank_details(
            creator_id,
            CreateBankDetailsRequest {
                bank_name: "Access Bank".to_string(),
                account_name: "Ada Creator".to_string(),
                account_number: "0123-4567-89".to_string(),
            },
        )
        .await;
    assert!(matches!(invalid, Err(AppError::Validation(_))));

    let missing = earnings.verify_bank_details(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    assert_eq!(earnings.list_bank_details(creator_id).await?.len(), 1);

    Ok(())
}
