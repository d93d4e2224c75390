#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scholarmart::{
    config::Settings,
    currency::{CurrencyService, RateProvider, StaticRateProvider, FALLBACK_USD_NGN},
    domain::{CreateProjectRequest, InitializePaymentRequest, PaymentInitialization, PaymentMethod, Project},
    payments::{FakeGateway, GatewayRegistry},
    service::ServiceContext,
    storage::LocalObjectStore,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use uuid::Uuid;

pub const TEST_RATE: f64 = 1600.0;

pub struct Harness {
    pub pool: SqlitePool,
    pub ctx: Arc<ServiceContext>,
    pub settings: Settings,
    pub gateways: HashMap<PaymentMethod, Arc<FakeGateway>>,
    pub storage_root: PathBuf,
}

impl Harness {
    pub fn gateway(&self, method: PaymentMethod) -> &FakeGateway {
        &self.gateways[&method]
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.storage_root);
    }
}

pub async fn test_pool() -> anyhow::Result<SqlitePool> {
    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// File-backed database with several connections, so concurrent requests
/// really do race inside SQLite.
pub async fn shared_pool(dir: &Path) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(dir.join("scholarmart.db"))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

pub fn test_settings(storage_root: &PathBuf) -> Settings {
    let mut settings = Settings::default();
    settings.storage.root = storage_root.to_string_lossy().to_string();
    settings.storage.encryption_secret = "integration-test-secret".to_string();
    settings.payments.paystack.secret_key = Some("sk_test_paystack".to_string());
    settings.payments.flutterwave.webhook_hash = Some("flw-test-hash".to_string());
    settings
}

pub async fn harness() -> anyhow::Result<Harness> {
    let providers: Vec<Arc<dyn RateProvider>> = vec![Arc::new(StaticRateProvider::new(TEST_RATE))];
    harness_with_rates(providers).await
}

pub async fn harness_with_rates(providers: Vec<Arc<dyn RateProvider>>) -> anyhow::Result<Harness> {
    let storage_root = temp_root();
    let pool = test_pool().await?;
    build(pool, providers, storage_root)
}

/// Same wiring as `harness`, over a multi-connection file database.
pub async fn concurrent_harness() -> anyhow::Result<Harness> {
    let storage_root = temp_root();
    std::fs::create_dir_all(&storage_root)?;
    let pool = shared_pool(&storage_root).await?;
    let providers: Vec<Arc<dyn RateProvider>> = vec![Arc::new(StaticRateProvider::new(TEST_RATE))];
    build(pool, providers, storage_root)
}

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("scholarmart-test-{}", Uuid::new_v4()))
}

fn build(
    pool: SqlitePool,
    providers: Vec<Arc<dyn RateProvider>>,
    storage_root: PathBuf,
) -> anyhow::Result<Harness> {
    let settings = test_settings(&storage_root);

    let mut registry = GatewayRegistry::new();
    let mut gateways = HashMap::new();
    for method in [
        PaymentMethod::Paystack,
        PaymentMethod::Stripe,
        PaymentMethod::Paypal,
        PaymentMethod::Flutterwave,
    ] {
        let gateway = Arc::new(FakeGateway::new(method));
        registry.register(gateway.clone());
        gateways.insert(method, gateway);
    }

    let currency = CurrencyService::new(providers, Duration::from_secs(1800), FALLBACK_USD_NGN);

    let ctx = Arc::new(ServiceContext::new(
        pool.clone(),
        Arc::new(registry),
        Arc::new(currency),
        Arc::new(LocalObjectStore::new(&storage_root)),
        &settings,
    ));

    Ok(Harness {
        pool,
        ctx,
        settings,
        gateways,
        storage_root,
    })
}

pub async fn create_project(
    h: &Harness,
    creator_id: Uuid,
    price_minor: i64,
    currency: &str,
) -> anyhow::Result<Project> {
    let project = h
        .ctx
        .project_service
        .create(
            creator_id,
            CreateProjectRequest {
                title: "Machine Learning for Crop Yield Prediction".to_string(),
                description: "Final year project with source code and report".to_string(),
                creator_name: "Ada Creator".to_string(),
                price_minor,
                currency: currency.to_string(),
            },
        )
        .await?;
    Ok(project)
}

pub async fn checkout(
    h: &Harness,
    buyer_id: Uuid,
    project_id: Uuid,
    method: PaymentMethod,
) -> anyhow::Result<PaymentInitialization> {
    let init = h
        .ctx
        .payment_service
        .initialize_payment(
            buyer_id,
            InitializePaymentRequest {
                project_id,
                payment_method: method,
                buyer_email: "student@example.com".to_string(),
                buyer_name: "Sam Student".to_string(),
            },
        )
        .await?;
    Ok(init)
}
