use std::sync::Arc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scholarmart::{
    api,
    config::Settings,
    currency::CurrencyService,
    payments::GatewayRegistry,
    service::ServiceContext,
    storage::LocalObjectStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scholarmart=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting ScholarMart server on {}:{}", settings.server.host, settings.server.port);

    if settings.storage.encryption_secret == Settings::default().storage.encryption_secret {
        tracing::warn!("storage.encryption_secret is the default; set SCHOLARMART__STORAGE__ENCRYPTION_SECRET");
    }

    // Initialize database
    let connect_options = SqliteConnectOptions::from_str(&settings.database.url)?
        .create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect_with(connect_options)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    // Payment gateways and exchange rates
    let gateways = Arc::new(GatewayRegistry::from_config(&settings.payments)?);
    let currency_service = Arc::new(CurrencyService::from_config(&settings.currency)?);
    let store = Arc::new(LocalObjectStore::new(&settings.storage.root));

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        db_pool,
        gateways,
        currency_service,
        store,
        &settings,
    ));

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
