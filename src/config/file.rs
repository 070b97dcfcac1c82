//! TOML configuration file loading
//!
//! Supports `~/.config/alexa-fhem/config.toml` (or the path in
//! `ALEXA_FHEM_CONFIG`) as a persistent config source.
//! All fields are optional, the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GatewayConfigFile {
    /// FHEM hub connection
    #[serde(default)]
    pub hub: HubFileConfig,

    /// Inbound HTTP server
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// FHEM hub configuration
#[derive(Debug, Default, Deserialize)]
pub struct HubFileConfig {
    /// Hostname of the FHEM web frontend
    pub host: Option<String>,

    /// Port of the FHEM web frontend
    pub port: Option<u16>,

    /// Use HTTPS
    pub tls: Option<bool>,

    /// Command path prefix (e.g. `/fhem?XHR=1&cmd=`)
    pub base_path: Option<String>,

    /// Basic auth user
    pub username: Option<String>,

    /// Basic auth password
    pub password: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Device receiving Alexa authorization grant codes
    pub gateway_device: Option<String>,

    /// Wait after a thermostat mode change, in milliseconds
    pub settle_ms: Option<u64>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Bearer key required on `/alexa`
    pub api_key: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `GatewayConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> GatewayConfigFile {
    let path = std::env::var("ALEXA_FHEM_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(config_file_path);

    match path {
        Some(path) if path.exists() => load_config_file_from(&path),
        _ => GatewayConfigFile::default(),
    }
}

/// Load a TOML config file from an explicit path
///
/// Falls back to `GatewayConfigFile::default()` with a warning if the file
/// can't be read or parsed.
pub fn load_config_file_from(path: &Path) -> GatewayConfigFile {
    match read_config_file(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "ignoring config file, using defaults"
            );
            GatewayConfigFile::default()
        }
    }
}

/// Read and parse a TOML config file
///
/// # Errors
///
/// Returns `Error::Io` if the file can't be read, `Error::Toml` if it isn't
/// valid TOML for the schema
pub fn read_config_file(path: &Path) -> Result<GatewayConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/alexa-fhem/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("alexa-fhem").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[hub]
host = "fhem.local"
port = 8083
tls = false

[server]
port = 9000
"#
        )
        .unwrap();

        let fc = load_config_file_from(file.path());
        assert_eq!(fc.hub.host.as_deref(), Some("fhem.local"));
        assert_eq!(fc.hub.port, Some(8083));
        assert_eq!(fc.hub.tls, Some(false));
        assert!(fc.hub.password.is_none());
        assert_eq!(fc.server.port, Some(9000));
    }

    #[test]
    fn test_unparseable_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hub\nhost = ").unwrap();

        let fc = load_config_file_from(file.path());
        assert!(fc.hub.host.is_none());
        assert!(fc.server.port.is_none());

        let err = read_config_file(file.path()).unwrap_err();
        assert!(matches!(err, crate::Error::Toml(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_config_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
