use crate::application::orders::DEFAULT_GATEWAY_TIMEOUT;
use crate::domain::event::EventCatalog;
use crate::error::{RegistrationError, Result};
use crate::infrastructure::razorpay::DEFAULT_BASE_URL;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Flags for `serve`. Each one can also come from the environment.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Payment gateway key id
    #[arg(long, env = "RAZORPAY_KEY_ID")]
    pub key_id: Option<String>,

    /// Payment gateway key secret, also used to verify payment signatures
    #[arg(long, env = "RAZORPAY_KEY_SECRET", hide_env_values = true)]
    pub key_secret: Option<String>,

    /// Payment gateway API base URL
    #[arg(long, env = "RAZORPAY_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub gateway_url: String,

    /// Seconds to wait for the payment gateway
    #[arg(long, env = "GATEWAY_TIMEOUT_SECS", default_value_t = DEFAULT_GATEWAY_TIMEOUT.as_secs())]
    pub gateway_timeout_secs: u64,

    /// Event catalog JSON file. The bundled catalog is used when absent.
    #[arg(long, env = "EVENT_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Issue orders locally instead of calling the payment gateway
    #[arg(long)]
    pub offline_gateway: bool,
}

#[derive(Debug, Clone)]
pub enum GatewayConfig {
    Razorpay {
        base_url: String,
        key_id: String,
        key_secret: String,
    },
    Offline,
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub gateway: GatewayConfig,
    pub signing_secret: String,
    pub gateway_timeout: Duration,
    pub catalog: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ServeArgs {
    pub fn into_config(self) -> Result<Config> {
        let signing_secret = non_empty(self.key_secret).ok_or_else(|| {
            RegistrationError::ValidationError(
                "RAZORPAY_KEY_SECRET is required to verify payments".to_string(),
            )
        })?;
        if self.gateway_timeout_secs == 0 {
            return Err(RegistrationError::ValidationError(
                "GATEWAY_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        let gateway = if self.offline_gateway {
            GatewayConfig::Offline
        } else {
            let key_id = non_empty(self.key_id).ok_or_else(|| {
                RegistrationError::ValidationError(
                    "RAZORPAY_KEY_ID is required unless --offline-gateway is set".to_string(),
                )
            })?;
            GatewayConfig::Razorpay {
                base_url: self.gateway_url,
                key_id,
                key_secret: signing_secret.clone(),
            }
        };

        Ok(Config {
            bind_address: format!("{}:{}", self.host, self.port),
            gateway,
            signing_secret,
            gateway_timeout: Duration::from_secs(self.gateway_timeout_secs),
            catalog: self.catalog,
            db_path: self.db_path,
        })
    }
}

impl Config {
    pub fn load_catalog(&self) -> Result<EventCatalog> {
        load_catalog(self.catalog.as_deref())
    }
}

pub fn load_catalog(path: Option<&std::path::Path>) -> Result<EventCatalog> {
    match path {
        Some(path) => EventCatalog::load(path),
        None => EventCatalog::bundled(),
    }
}
