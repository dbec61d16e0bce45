use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::errors::CheckoutError;
use crate::models::payment::ServiceCredentials;

pub const PRODUCTION_URL: &str = "https://api.getnet.com.br";
pub const SANDBOX_URL: &str = "https://api-sandbox.getnet.com.br";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEnvironment {
    Production,
    #[default]
    Sandbox,
}

/// Never derive `Debug` here, the client secret is a plain string until
/// it is moved into [`ServiceCredentials`].
#[derive(Deserialize)]
pub struct Gateway {
    #[serde(default)]
    pub environment: GatewayEnvironment,
    /// Overrides the URL implied by `environment`.
    pub url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub seller_id: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

impl Gateway {
    pub fn base_url(&self) -> String {
        match &self.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => match self.environment {
                GatewayEnvironment::Production => PRODUCTION_URL.to_string(),
                GatewayEnvironment::Sandbox => SANDBOX_URL.to_string(),
            },
        }
    }

    pub fn service_credentials(&self) -> Result<ServiceCredentials, CheckoutError> {
        let client_id = required(&self.client_id, "gateway.client_id")?;
        let client_secret = required(&self.client_secret, "gateway.client_secret")?;
        let seller_id = required(&self.seller_id, "gateway.seller_id")?;

        ServiceCredentials::new(client_id, client_secret.into(), seller_id)
    }
}

fn required(value: &Option<String>, key: &str) -> Result<String, CheckoutError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(missing(key)),
    }
}

fn missing(key: &str) -> CheckoutError {
    CheckoutError::Configuration(format!("missing {}", key))
}

/// Fixed values sent with every authorization request.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentProfile {
    pub amount_in_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_product_type")]
    pub product_type: String,
    #[serde(default = "default_transaction_type")]
    pub transaction_type: String,
    pub soft_descriptor: String,
    pub category_code: String,
    #[serde(default)]
    pub sales_tax: i64,
    #[serde(default = "default_positive_statuses")]
    pub positive_statuses: Vec<String>,
    #[serde(default = "default_max_installments")]
    pub max_installments: u32,
}

fn default_currency() -> String {
    "BRL".to_string()
}

fn default_product_type() -> String {
    "digital_content".to_string()
}

fn default_transaction_type() -> String {
    "FULL".to_string()
}

fn default_positive_statuses() -> Vec<String> {
    vec![
        "approved".to_string(),
        "authorized".to_string(),
        "confirmed".to_string(),
    ]
}

fn default_max_installments() -> u32 {
    12
}

#[derive(Deserialize)]
pub struct Settings {
    pub gateway: Gateway,
    pub payment: PaymentProfile,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("CHECKOUT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
