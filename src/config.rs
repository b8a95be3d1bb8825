use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use thiserror::Error;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;

// Published sandbox credentials for both providers. Real deployments must
// override these via config files or APP__-prefixed environment variables.
const MOMO_SANDBOX_PARTNER_CODE: &str = "MOMO";
const MOMO_SANDBOX_ACCESS_KEY: &str = "F8BBA842ECF85";
const MOMO_SANDBOX_SECRET_KEY: &str = "K951B6PE1waDMi640xX08PD3vg6EkVlz";
const MOMO_SANDBOX_ENDPOINT: &str = "https://test-payment.momo.vn/v2/gateway/api/create";
const VNPAY_SANDBOX_TMN_CODE: &str = "NCB";
const VNPAY_SANDBOX_HASH_SECRET: &str = "UVMCJECLPUWPXXLLLGWRUXOMTURXPKEL";
const VNPAY_SANDBOX_ENDPOINT: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// MoMo e-wallet gateway settings.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct MoMoConfig {
    #[validate(length(min = 1))]
    pub partner_code: String,
    #[validate(length(min = 1))]
    pub access_key: String,
    #[validate(length(min = 1))]
    pub secret_key: String,
    #[validate(url)]
    pub endpoint: String,
    pub partner_name: String,
}

/// VNPay hosted-page gateway settings.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct VnpayConfig {
    #[validate(length(min = 1))]
    pub tmn_code: String,
    #[validate(length(min = 1))]
    pub hash_secret: String,
    #[validate(url)]
    pub endpoint: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    /// Public base URL the providers redirect and notify back to.
    #[validate(url)]
    pub callback_base_url: String,
    /// Bound on every outbound gateway call; expiry is treated as a gateway
    /// failure, not an indeterminate state.
    #[validate(range(min = 1, max = 120))]
    pub gateway_timeout_secs: u64,
    #[validate]
    pub momo: MoMoConfig,
    #[validate]
    pub vnpay: VnpayConfig,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads configuration from built-in defaults, optional `config/` files, and
/// `APP__`-prefixed environment variables (highest precedence).
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("callback_base_url", "http://localhost:8080")?
        .set_default("gateway_timeout_secs", DEFAULT_GATEWAY_TIMEOUT_SECS as i64)?
        .set_default("momo.partner_code", MOMO_SANDBOX_PARTNER_CODE)?
        .set_default("momo.access_key", MOMO_SANDBOX_ACCESS_KEY)?
        .set_default("momo.secret_key", MOMO_SANDBOX_SECRET_KEY)?
        .set_default("momo.endpoint", MOMO_SANDBOX_ENDPOINT)?
        .set_default("momo.partner_name", "Checkout Demo Store")?
        .set_default("vnpay.tmn_code", VNPAY_SANDBOX_TMN_CODE)?
        .set_default("vnpay.hash_secret", VNPAY_SANDBOX_HASH_SECRET)?
        .set_default("vnpay.endpoint", VNPAY_SANDBOX_ENDPOINT)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app: AppConfig = config.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Initializes the tracing subscriber; honors `RUST_LOG` when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("checkout_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        tracing_subscriber::registry()
            .with(EnvFilter::new(filter_directive))
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(EnvFilter::new(filter_directive))
            .with(fmt::layer())
            .init();
    }
}
