use std::env;
use std::path::PathBuf;

use crate::sdk::Client;
use crate::{Result, DEFAULT_CERT_PATH, DEFAULT_PORT};

/// Where and how to reach a relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub addr: String,
    pub ca_cert: PathBuf,
    pub domain: String,
    pub tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            ca_cert: PathBuf::from(DEFAULT_CERT_PATH),
            domain: "localhost".to_string(),
            tls: true,
        }
    }
}

impl ClientConfig {
    /// Reads `VCU_RELAY_ADDR`, `VCU_RELAY_CA_CERT`, `VCU_RELAY_DOMAIN` and
    /// `VCU_RELAY_DISABLE_TLS`, falling back to the defaults for anything unset or empty.
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let defaults = Self::default();
        Self {
            addr: var("VCU_RELAY_ADDR").unwrap_or(defaults.addr),
            ca_cert: var("VCU_RELAY_CA_CERT").map(PathBuf::from).unwrap_or(defaults.ca_cert),
            domain: var("VCU_RELAY_DOMAIN").unwrap_or(defaults.domain),
            tls: var("VCU_RELAY_DISABLE_TLS").as_deref() != Some("true"),
        }
    }
}

/// Connects according to `config`.
///
/// # Examples
///
/// ```no_run
/// use vcu_relay::sdk;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = sdk::connect_from_env().await?;
///     client.send("orchestrator", "vcu-1", serde_json::json!({"cmd": "start"})).await?;
///     Ok(())
/// }
/// ```
pub async fn connect(config: &ClientConfig) -> Result<Client> {
    if config.tls {
        Client::connect_tls(&config.addr, &config.domain, &config.ca_cert).await
    } else {
        log::debug!("Connecting to {} without TLS", config.addr);
        Client::connect_plain(&config.addr).await
    }
}

pub async fn connect_from_env() -> Result<Client> {
    connect(&ClientConfig::from_env()).await
}
