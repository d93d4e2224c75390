use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    crypto::SecretBox,
    domain::*,
    error::{AppError, Result},
    repository::{BankDetailsRepository, EarningsRepository, WithdrawalRepository},
    service::notification_service::NotificationService,
};

pub struct EarningsService {
    earnings_repo: Arc<dyn EarningsRepository>,
    withdrawal_repo: Arc<dyn WithdrawalRepository>,
    bank_details_repo: Arc<dyn BankDetailsRepository>,
    notifications: Arc<NotificationService>,
    secret_box: SecretBox,
    default_currency: String,
}

impl EarningsService {
    pub fn new(
        earnings_repo: Arc<dyn EarningsRepository>,
        withdrawal_repo: Arc<dyn WithdrawalRepository>,
        bank_details_repo: Arc<dyn BankDetailsRepository>,
        notifications: Arc<NotificationService>,
        secret_box: SecretBox,
        default_currency: String,
    ) -> Self {
        Self {
            earnings_repo,
            withdrawal_repo,
            bank_details_repo,
            notifications,
            secret_box,
            default_currency,
        }
    }

    fn currency_or_default(&self, currency: Option<&str>) -> String {
        currency
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| self.default_currency.clone())
    }

    /// Recomputed from the ledger on every call. A failed read yields a
    /// zeroed balance rather than an error.
    pub async fn balance(&self, creator_id: Uuid, currency: Option<&str>) -> CreatorBalance {
        let currency = self.currency_or_default(currency);
        match self.compute_balance(creator_id, &currency).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(creator_id = %creator_id, "Failed to compute balance: {}", e);
                CreatorBalance::zeroed(&currency)
            }
        }
    }

    async fn compute_balance(&self, creator_id: Uuid, currency: &str) -> Result<CreatorBalance> {
        let earnings = self.earnings_repo.sum_net_by_status(creator_id, currency).await?;
        let withdrawals = self.withdrawal_repo.sum_by_status(creator_id, currency).await?;

        let mut balance = CreatorBalance::zeroed(currency);
        for (status, amount) in earnings {
            match status {
                EarningsStatus::Available => balance.available_minor += amount,
                EarningsStatus::Pending => balance.pending_minor += amount,
                EarningsStatus::Paid => balance.paid_minor += amount,
            }
            balance.total_minor += amount;
        }

        let mut committed = 0;
        for (status, amount) in withdrawals {
            if !status.is_terminal() {
                balance.pending_withdrawals_minor += amount;
            }
            if status != WithdrawalStatus::Failed {
                committed += amount;
            }
        }
        balance.withdrawable_minor = (balance.available_minor - committed).max(0);

        Ok(balance)
    }

    pub async fn list_earnings(&self, creator_id: Uuid) -> Result<Vec<CreatorEarnings>> {
        self.earnings_repo.list_by_creator(creator_id).await
    }

    pub async fn request_withdrawal(
        &self,
        creator_id: Uuid,
        request: WithdrawalRequest,
    ) -> Result<Withdrawal> {
        request.validate()?;

        if request.amount_minor <= 0 {
            return Err(AppError::Validation(
                "Withdrawal amount must be greater than zero".to_string(),
            ));
        }

        let bank_details = self
            .bank_details_repo
            .find_by_id(request.bank_details_id)
            .await?
            .filter(|details| details.creator_id == creator_id)
            .ok_or_else(|| AppError::Validation("Bank details not found".to_string()))?;

        if !bank_details.is_verified {
            return Err(AppError::Validation("Bank account is not verified".to_string()));
        }

        let now = Utc::now();
        let withdrawal = Withdrawal {
            id: Uuid::new_v4(),
            creator_id,
            bank_details_id: bank_details.id,
            amount_minor: request.amount_minor,
            currency: self.currency_or_default(request.currency.as_deref()),
            status: WithdrawalStatus::Pending,
            note: request.note,
            created_at: now,
            updated_at: now,
            processed_at: None,
        };

        let created = self
            .withdrawal_repo
            .create_within_balance(withdrawal)
            .await?
            .ok_or_else(|| AppError::Validation("Insufficient balance".to_string()))?;

        tracing::info!(
            creator_id = %creator_id,
            withdrawal_id = %created.id,
            amount_minor = created.amount_minor,
            "Withdrawal requested"
        );

        Ok(created)
    }

    pub async fn list_withdrawals(&self, creator_id: Uuid) -> Result<Vec<Withdrawal>> {
        self.withdrawal_repo.list_by_creator(creator_id).await
    }

    /// Moves a withdrawal forward in the manual payout process.
    pub async fn update_withdrawal_status(
        &self,
        id: Uuid,
        next: WithdrawalStatus,
    ) -> Result<Withdrawal> {
        let current = self
            .withdrawal_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Withdrawal not found".to_string()))?;

        if !current.status.can_transition_to(next) {
            return Err(AppError::BadRequest(format!(
                "Cannot move withdrawal from {} to {}",
                current.status.as_str(),
                next.as_str()
            )));
        }

        let updated = self
            .withdrawal_repo
            .update_status(id, current.status, next)
            .await?
            .ok_or_else(|| AppError::Conflict("Withdrawal was updated concurrently".to_string()))?;

        tracing::info!(
            withdrawal_id = %id,
            from = current.status.as_str(),
            to = next.as_str(),
            "Withdrawal status changed"
        );
        self.notifications.notify_withdrawal_updated(&updated).await;

        Ok(updated)
    }

    pub async fn add_bank_details(
        &self,
        creator_id: Uuid,
        request: CreateBankDetailsRequest,
    ) -> Result<BankDetails> {
        request.validate()?;

        let account_number: String = request
            .account_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if !account_number.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::Validation("Invalid account number".to_string()));
        }

        let last4_start = account_number.len().saturating_sub(4);
        let details = BankDetails {
            id: Uuid::new_v4(),
            creator_id,
            bank_name: request.bank_name,
            account_name: request.account_name,
            account_number_encrypted: self.secret_box.encrypt(&account_number)?,
            account_last4: account_number[last4_start..].to_string(),
            is_verified: false,
            created_at: Utc::now(),
        };

        self.bank_details_repo.create(details).await
    }

    pub async fn list_bank_details(&self, creator_id: Uuid) -> Result<Vec<BankDetails>> {
        self.bank_details_repo.list_by_creator(creator_id).await
    }

    pub async fn verify_bank_details(&self, id: Uuid) -> Result<BankDetails> {
        if self.bank_details_repo.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound("Bank details not found".to_string()));
        }
        self.bank_details_repo.mark_verified(id).await
    }

    /// Plain account number for the payout operator.
    pub async fn reveal_account_number(&self, id: Uuid) -> Result<String> {
        let details = self
            .bank_details_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Bank details not found".to_string()))?;
        self.secret_box.decrypt(&details.account_number_encrypted)
    }
}
