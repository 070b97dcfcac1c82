//! Configuration management for the FHEM gateway

pub mod file;

use std::time::Duration;

use secrecy::SecretString;

use crate::{Error, Result};
use file::GatewayConfigFile;

/// Gateway configuration
#[derive(Debug)]
pub struct Config {
    /// FHEM hub connection
    pub hub: HubConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,
}

/// FHEM hub connection settings
#[derive(Debug)]
pub struct HubConfig {
    /// Hostname of the FHEM web frontend (`FHEM_HOST`)
    pub host: String,

    /// Port (`FHEM_PORT`)
    pub port: u16,

    /// Use HTTPS (`FHEM_TLS`)
    pub tls: bool,

    /// Command path prefix, the urlencoded command is appended (`FHEM_BASE`)
    pub base_path: String,

    /// Basic auth user (`FHEM_USER`)
    pub username: String,

    /// Basic auth password (`FHEM_PASS`)
    pub password: SecretString,

    /// Timeout for a single hub request (`FHEM_TIMEOUT_SECS`)
    pub timeout: Duration,

    /// Device that receives `AcceptGrant` codes (`FHEM_GATEWAY_DEVICE`)
    pub gateway_device: String,

    /// Wait after a thermostat mode change before reading it back (`FHEM_SETTLE_MS`)
    pub settle_delay: Duration,
}

impl HubConfig {
    /// Scheme, host, port and command prefix
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}{}", self.host, self.port, self.base_path)
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Bearer key for `/alexa` (from `ALEXA_FHEM_API_KEY` env)
    pub api_key: Option<String>,
}

pub const DEFAULT_HUB_PORT: u16 = 443;
pub const DEFAULT_BASE_PATH: &str = "/fhem?XHR=1&cmd=";
pub const DEFAULT_USER: &str = "alexa";
pub const DEFAULT_GATEWAY_DEVICE: &str = "alexa";
pub const DEFAULT_SERVER_PORT: u16 = 8091;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SETTLE_MS: u64 = 2000;

fn parse_bool(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}

impl Config {
    /// Load configuration from the environment and the optional TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the hub host or password is missing
    pub fn load() -> Result<Self> {
        Self::load_from(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Merge configuration sources: env > toml > default
    ///
    /// # Errors
    ///
    /// Returns error if the hub host or password is missing
    pub fn load_from(fc: GatewayConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = env("FHEM_HOST")
            .or(fc.hub.host)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config("FHEM_HOST is not set".to_string()))?;

        let password = env("FHEM_PASS")
            .or(fc.hub.password)
            .ok_or_else(|| Error::Config("FHEM_PASS is not set".to_string()))?;

        let port = env("FHEM_PORT")
            .and_then(|s| s.parse().ok())
            .or(fc.hub.port)
            .unwrap_or(DEFAULT_HUB_PORT);

        let hub = HubConfig {
            host,
            port,
            tls: env("FHEM_TLS")
                .map(|v| parse_bool(&v))
                .or(fc.hub.tls)
                .unwrap_or(true),
            base_path: env("FHEM_BASE")
                .or(fc.hub.base_path)
                .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string()),
            username: env("FHEM_USER")
                .or(fc.hub.username)
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: SecretString::from(password),
            timeout: Duration::from_secs(
                env("FHEM_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .or(fc.hub.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            gateway_device: env("FHEM_GATEWAY_DEVICE")
                .or(fc.hub.gateway_device)
                .unwrap_or_else(|| DEFAULT_GATEWAY_DEVICE.to_string()),
            settle_delay: Duration::from_millis(
                env("FHEM_SETTLE_MS")
                    .and_then(|s| s.parse().ok())
                    .or(fc.hub.settle_ms)
                    .unwrap_or(DEFAULT_SETTLE_MS),
            ),
        };

        // API server config (env > toml > default)
        let api_server = ApiServerConfig {
            port: env("ALEXA_FHEM_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_SERVER_PORT),
            api_key: env("ALEXA_FHEM_API_KEY").or(fc.server.api_key),
        };

        Ok(Self { hub, api_server })
    }
}
