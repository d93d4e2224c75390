use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Withdrawal {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub bank_details_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub status: WithdrawalStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WithdrawalStatus::Pending),
            "processing" => Some(WithdrawalStatus::Processing),
            "completed" => Some(WithdrawalStatus::Completed),
            "failed" => Some(WithdrawalStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Completed | WithdrawalStatus::Failed)
    }

    /// Manual payout processing only moves forward.
    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        match (self, next) {
            (WithdrawalStatus::Pending, WithdrawalStatus::Processing) => true,
            (WithdrawalStatus::Pending | WithdrawalStatus::Processing, WithdrawalStatus::Completed) => true,
            (WithdrawalStatus::Pending | WithdrawalStatus::Processing, WithdrawalStatus::Failed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct WithdrawalRequest {
    pub amount_minor: i64,
    pub bank_details_id: Uuid,
    pub currency: Option<String>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// A creator's payout account. The account number is stored encrypted and
/// only ever leaves the service masked.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BankDetails {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub bank_name: String,
    pub account_name: String,
    #[serde(skip_serializing)]
    pub account_number_encrypted: String,
    pub account_last4: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl BankDetails {
    pub fn masked_account_number(&self) -> String {
        format!("******{}", self.account_last4)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBankDetailsRequest {
    #[validate(length(min = 1, max = 100))]
    pub bank_name: String,
    #[validate(length(min = 1, max = 100))]
    pub account_name: String,
    #[validate(length(min = 6, max = 34))]
    pub account_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdrawal_transitions() {
        use WithdrawalStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(WithdrawalStatus::Completed.is_terminal());
        assert!(WithdrawalStatus::Failed.is_terminal());
        assert!(!WithdrawalStatus::Processing.is_terminal());
    }
}
