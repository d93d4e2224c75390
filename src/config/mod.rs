use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};
use uuid::Uuid;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub marketplace: MarketplaceConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketplaceConfig {
    /// Currency used for balances and withdrawals when the caller does not pick one
    pub default_currency: String,
    /// Where gateways send the buyer after checkout
    pub payment_callback_url: String,
    /// Users allowed to verify bank accounts and process payouts
    #[serde(default)]
    pub admin_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaymentsConfig {
    #[serde(default)]
    pub paystack: PaystackConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub paypal: PaypalConfig,
    #[serde(default)]
    pub flutterwave: FlutterwaveConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaystackConfig {
    pub secret_key: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaypalConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FlutterwaveConfig {
    pub secret_key: Option<String>,
    /// Shared secret Flutterwave echoes in the `verif-hash` webhook header
    pub webhook_hash: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CurrencyConfig {
    pub cache_ttl_secs: u64,
    pub fallback_usd_ngn: f64,
    /// Pin the USD/NGN rate instead of asking upstream providers
    pub fixed_usd_ngn: Option<f64>,
    #[serde(default)]
    pub providers: Vec<RateProviderConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateProviderConfig {
    pub name: String,
    pub url: String,
    /// JSON pointer to the NGN-per-USD value in the provider's response
    pub pointer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub root: String,
    pub encryption_secret: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 30 * 60,
            fallback_usd_ngn: 1650.0,
            fixed_usd_ngn: None,
            providers: default_rate_providers(),
        }
    }
}

pub fn default_rate_providers() -> Vec<RateProviderConfig> {
    vec![
        RateProviderConfig {
            name: "open-er-api".to_string(),
            url: "https://open.er-api.com/v6/latest/USD".to_string(),
            pointer: "/rates/NGN".to_string(),
        },
        RateProviderConfig {
            name: "exchangerate-api".to_string(),
            url: "https://api.exchangerate-api.com/v4/latest/USD".to_string(),
            pointer: "/rates/NGN".to_string(),
        },
        RateProviderConfig {
            name: "fawazahmed0".to_string(),
            url: "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies/usd.json".to_string(),
            pointer: "/usd/ngn".to_string(),
        },
    ]
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("server.base_url", defaults.server.base_url)?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections as i64)?
            .set_default("marketplace.default_currency", defaults.marketplace.default_currency)?
            .set_default("marketplace.payment_callback_url", defaults.marketplace.payment_callback_url)?
            .set_default("currency.cache_ttl_secs", defaults.currency.cache_ttl_secs as i64)?
            .set_default("currency.fallback_usd_ngn", defaults.currency.fallback_usd_ngn)?
            .set_default("storage.root", defaults.storage.root)?
            .set_default("storage.encryption_secret", defaults.storage.encryption_secret)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with SCHOLARMART__ prefix, double underscore separates levels)
            .add_source(
                Environment::with_prefix("SCHOLARMART")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("marketplace.admin_ids"),
            )

            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        if settings.currency.providers.is_empty() {
            settings.currency.providers = default_rate_providers();
        }
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://scholarmart.db".to_string(),
                max_connections: 10,
            },
            marketplace: MarketplaceConfig {
                default_currency: "USD".to_string(),
                payment_callback_url: "http://localhost:8080/payment/callback".to_string(),
                admin_ids: Vec::new(),
            },
            payments: PaymentsConfig::default(),
            currency: CurrencyConfig::default(),
            storage: StorageConfig {
                root: "./storage".to_string(),
                encryption_secret: "change-me-in-production".to_string(),
            },
        }
    }
}
