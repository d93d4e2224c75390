use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::{AppError, Result};

pub mod order_repository;
pub mod project_repository;
pub mod purchase_repository;
pub mod earnings_repository;
pub mod withdrawal_repository;
pub mod bank_details_repository;
pub mod notification_repository;

pub use order_repository::SqliteOrderRepository;
pub use project_repository::SqliteProjectRepository;
pub use purchase_repository::SqlitePurchaseRepository;
pub use earnings_repository::SqliteEarningsRepository;
pub use withdrawal_repository::SqliteWithdrawalRepository;
pub use bank_details_repository::SqliteBankDetailsRepository;
pub use notification_repository::SqliteNotificationRepository;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: NewOrder) -> Result<Order>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>>;
    async fn find_by_reference(&self, reference: &str) -> Result<Option<Order>>;
    async fn list_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>>;
    async fn attach_reference(&self, id: Uuid, reference: &str) -> Result<Order>;
    /// Moves a pending order to `failed`. Returns false if it was not pending.
    async fn mark_failed(&self, id: Uuid) -> Result<bool>;
    /// Applies every settlement write as one unit, only if the order is still pending.
    async fn settle(&self, settlement: &Settlement) -> Result<SettlementOutcome>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, creator_id: Uuid, project: CreateProjectRequest) -> Result<Project>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Project>>;
    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<Project>>;
    async fn set_file(&self, id: Uuid, file_key: &str, file_name: &str) -> Result<Project>;
}

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    async fn find_by_order(&self, order_id: Uuid) -> Result<Option<Purchase>>;
    async fn find_for_buyer(&self, buyer_id: Uuid, project_id: Uuid) -> Result<Option<Purchase>>;
    async fn list_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Purchase>>;
    async fn count_by_order(&self, order_id: Uuid) -> Result<i64>;
    async fn record_download(&self, id: Uuid) -> Result<Purchase>;
}

#[async_trait]
pub trait EarningsRepository: Send + Sync {
    async fn find_by_order(&self, order_id: Uuid) -> Result<Option<CreatorEarnings>>;
    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<CreatorEarnings>>;
    async fn count_by_order(&self, order_id: Uuid) -> Result<i64>;
    /// Net amount per earnings status for one creator and currency.
    async fn sum_net_by_status(&self, creator_id: Uuid, currency: &str) -> Result<Vec<(EarningsStatus, i64)>>;
}

#[async_trait]
pub trait WithdrawalRepository: Send + Sync {
    /// Inserts the withdrawal only if it fits within the creator's withdrawable
    /// balance, checked by the same statement. `None` means it did not fit.
    async fn create_within_balance(&self, withdrawal: Withdrawal) -> Result<Option<Withdrawal>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Withdrawal>>;
    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<Withdrawal>>;
    /// Amount per withdrawal status for one creator and currency.
    async fn sum_by_status(&self, creator_id: Uuid, currency: &str) -> Result<Vec<(WithdrawalStatus, i64)>>;
    /// Compare-and-set on status. `None` means the withdrawal was not in `from`.
    async fn update_status(
        &self,
        id: Uuid,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    ) -> Result<Option<Withdrawal>>;
}

#[async_trait]
pub trait BankDetailsRepository: Send + Sync {
    async fn create(&self, details: BankDetails) -> Result<BankDetails>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BankDetails>>;
    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<BankDetails>>;
    async fn mark_verified(&self, id: Uuid) -> Result<BankDetails>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: NewNotification) -> Result<Notification>;
    async fn list_by_user(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>>;
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool>;
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64>;
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

pub(crate) fn to_utc(dt: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(dt, Utc)
}
