//! HTTP client for the FHEM command API

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};

use super::{HubReply, HubTransport, parse_reply};
use crate::config::HubConfig;
use crate::{Error, Result};

/// FHEM web frontend client
///
/// Each command is sent as `GET <base_url><urlencoded command>` with basic
/// auth, matching `FHEMWEB`'s `XHR=1&cmd=` interface.
#[derive(Debug)]
pub struct FhemClient {
    client: Client,
    base_url: String,
    username: String,
    password: SecretString,
}

impl FhemClient {
    /// Create a client from hub configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &HubConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: SecretString::from(config.password.expose_secret().to_string()),
        })
    }

    /// Full request URL for a command
    fn command_url(&self, command: &str) -> String {
        format!("{}{}", self.base_url, urlencoding::encode(command))
    }
}

/// Connection-level failures mean the hub is unreachable; anything else is
/// reported as a plain HTTP error
fn classify(e: reqwest::Error) -> Error {
    if e.is_connect() || e.is_timeout() {
        Error::HubUnreachable(e.to_string())
    } else {
        Error::Http(e)
    }
}

#[async_trait]
impl HubTransport for FhemClient {
    async fn send(&self, command: &str) -> Result<HubReply> {
        tracing::debug!(command, "fhem request");

        let response = self
            .client
            .get(self.command_url(command))
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Hub(format!("FHEM returned {status}: {body}")));
        }

        let json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        let body = response.text().await.map_err(classify)?;
        if body.is_empty() {
            tracing::debug!("fhem: no answer");
        } else {
            tracing::trace!(body = %body, "fhem reply");
        }

        parse_reply(&body, json)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn hub_config() -> HubConfig {
        HubConfig {
            host: "fhem.example.org".to_string(),
            port: 8083,
            tls: false,
            base_path: "/fhem?XHR=1&cmd=".to_string(),
            username: "alexa".to_string(),
            password: SecretString::from("secret".to_string()),
            timeout: Duration::from_secs(5),
            gateway_device: "alexa".to_string(),
            settle_delay: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_command_url_is_encoded() {
        let client = FhemClient::new(&hub_config()).unwrap();
        let url = client.command_url("set lamp dim 42;jsonlist2 lamp brightness");
        assert_eq!(
            url,
            "http://fhem.example.org:8083/fhem?XHR=1&cmd=set%20lamp%20dim%2042%3Bjsonlist2%20lamp%20brightness"
        );
    }

    #[test]
    fn test_debug_does_not_leak_password() {
        let client = FhemClient::new(&hub_config()).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret"));
    }
}
