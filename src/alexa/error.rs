//! Alexa-facing error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types understood by the Alexa Smart Home API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    InvalidDirective,
    BridgeUnreachable,
    InternalError,
    TemperatureValueOutOfRange,
    UnsupportedThermostatMode,
    AcceptGrantFailed,
    InvalidAuthorizationCredential,
}

/// Failure while handling a directive
///
/// Every variant ends up as a `{type, message}` payload inside a regular
/// response envelope, never as a transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    /// Namespace/name not supported, or a required field is missing
    #[error("{0}")]
    InvalidDirective(String),

    /// Hub returned nothing usable or could not be reached
    #[error("{0}")]
    BridgeUnreachable(String),

    /// Anything else, including endpoints whose cookie lacks a required device
    #[error("{0}")]
    Internal(String),

    /// Temperature given in a scale other than Celsius
    #[error("only CELSIUS is supported, got {0}")]
    TemperatureOutOfRange(String),

    /// Thermostat mode outside OFF, AUTO, HEAT, ECO
    #[error("only AUTO, ECO, HEAT and OFF are supported, got {0}")]
    UnsupportedThermostatMode(String),

    /// Authorization grant could not be handed to the hub
    #[error("{0}")]
    AcceptGrantFailed(String),

    /// Caller did not present the configured API key
    #[error("{0}")]
    InvalidCredential(String),
}

impl DirectiveError {
    /// Alexa error type for this failure
    #[must_use]
    pub const fn error_type(&self) -> ErrorType {
        match self {
            Self::InvalidDirective(_) => ErrorType::InvalidDirective,
            Self::BridgeUnreachable(_) => ErrorType::BridgeUnreachable,
            Self::Internal(_) => ErrorType::InternalError,
            Self::TemperatureOutOfRange(_) => ErrorType::TemperatureValueOutOfRange,
            Self::UnsupportedThermostatMode(_) => ErrorType::UnsupportedThermostatMode,
            Self::AcceptGrantFailed(_) => ErrorType::AcceptGrantFailed,
            Self::InvalidCredential(_) => ErrorType::InvalidAuthorizationCredential,
        }
    }

    /// Interface namespace the error response is reported under
    #[must_use]
    pub const fn namespace(&self) -> &'static str {
        match self {
            Self::AcceptGrantFailed(_) => "Alexa.Authorization",
            _ => "Alexa",
        }
    }

    /// Error payload `{type, message}`
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.error_type(),
            "message": self.to_string(),
        })
    }
}

impl From<crate::Error> for DirectiveError {
    fn from(e: crate::Error) -> Self {
        match e {
            crate::Error::HubUnreachable(msg) => Self::BridgeUnreachable(msg),
            crate::Error::Serialization(e) => {
                Self::BridgeUnreachable(format!("malformed hub reply: {e}"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_payload_shape() {
        let err = DirectiveError::TemperatureOutOfRange("FAHRENHEIT".to_string());
        let payload = err.payload();
        assert_eq!(payload["type"], "TEMPERATURE_VALUE_OUT_OF_RANGE");
        assert_eq!(payload["message"], "only CELSIUS is supported, got FAHRENHEIT");
        assert_eq!(err.namespace(), "Alexa");
    }

    #[test]
    fn test_hub_errors_map_to_alexa_types() {
        let unreachable: DirectiveError =
            crate::Error::HubUnreachable("connection refused".to_string()).into();
        assert_eq!(unreachable.error_type(), ErrorType::BridgeUnreachable);

        let status: DirectiveError = crate::Error::Hub("FHEM returned 401".to_string()).into();
        assert_eq!(status.error_type(), ErrorType::InternalError);
    }

    #[test]
    fn test_accept_grant_failure_namespace() {
        let err = DirectiveError::AcceptGrantFailed("hub down".to_string());
        assert_eq!(err.namespace(), "Alexa.Authorization");
        assert_eq!(err.payload()["type"], "ACCEPT_GRANT_FAILED");
    }
}
