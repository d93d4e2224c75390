pub mod payment_service;
pub mod earnings_service;
pub mod notification_service;
pub mod project_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::config::Settings;
use crate::crypto::SecretBox;
use crate::currency::CurrencyService;
use crate::payments::GatewayRegistry;
use crate::repository::*;
use crate::storage::ObjectStore;
use earnings_service::EarningsService;
use notification_service::NotificationService;
use payment_service::PaymentService;
use project_service::ProjectService;

pub use project_service::ProjectDownload;

pub struct ServiceContext {
    pub order_repo: Arc<dyn OrderRepository>,
    pub project_repo: Arc<dyn ProjectRepository>,
    pub purchase_repo: Arc<dyn PurchaseRepository>,
    pub earnings_repo: Arc<dyn EarningsRepository>,
    pub withdrawal_repo: Arc<dyn WithdrawalRepository>,
    pub bank_details_repo: Arc<dyn BankDetailsRepository>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub payment_service: Arc<PaymentService>,
    pub earnings_service: Arc<EarningsService>,
    pub notification_service: Arc<NotificationService>,
    pub project_service: Arc<ProjectService>,
    pub currency_service: Arc<CurrencyService>,
    pub gateways: Arc<GatewayRegistry>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        db_pool: SqlitePool,
        gateways: Arc<GatewayRegistry>,
        currency_service: Arc<CurrencyService>,
        store: Arc<dyn ObjectStore>,
        settings: &Settings,
    ) -> Self {
        // Create repositories
        let order_repo: Arc<dyn OrderRepository> = Arc::new(SqliteOrderRepository::new(db_pool.clone()));
        let project_repo: Arc<dyn ProjectRepository> = Arc::new(SqliteProjectRepository::new(db_pool.clone()));
        let purchase_repo: Arc<dyn PurchaseRepository> = Arc::new(SqlitePurchaseRepository::new(db_pool.clone()));
        let earnings_repo: Arc<dyn EarningsRepository> = Arc::new(SqliteEarningsRepository::new(db_pool.clone()));
        let withdrawal_repo: Arc<dyn WithdrawalRepository> = Arc::new(SqliteWithdrawalRepository::new(db_pool.clone()));
        let bank_details_repo: Arc<dyn BankDetailsRepository> = Arc::new(SqliteBankDetailsRepository::new(db_pool.clone()));
        let notification_repo: Arc<dyn NotificationRepository> = Arc::new(SqliteNotificationRepository::new(db_pool.clone()));

        // Create services
        let notification_service = Arc::new(NotificationService::new(notification_repo.clone()));
        let payment_service = Arc::new(PaymentService::new(
            order_repo.clone(),
            project_repo.clone(),
            gateways.clone(),
            currency_service.clone(),
            notification_service.clone(),
            settings.marketplace.payment_callback_url.clone(),
        ));
        let earnings_service = Arc::new(EarningsService::new(
            earnings_repo.clone(),
            withdrawal_repo.clone(),
            bank_details_repo.clone(),
            notification_service.clone(),
            SecretBox::new(&settings.storage.encryption_secret),
            settings.marketplace.default_currency.clone(),
        ));
        let project_service = Arc::new(ProjectService::new(
            project_repo.clone(),
            purchase_repo.clone(),
            store,
        ));

        Self {
            order_repo,
            project_repo,
            purchase_repo,
            earnings_repo,
            withdrawal_repo,
            bank_details_repo,
            notification_repo,
            payment_service,
            earnings_service,
            notification_service,
            project_service,
            currency_service,
            gateways,
            db_pool,
        }
    }
}
