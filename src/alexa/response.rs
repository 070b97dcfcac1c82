//! Outbound response envelopes and single-shot completion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{DirectiveError, RawDirective};

/// Alexa Smart Home payload version
pub const PAYLOAD_VERSION: &str = "3";

/// Fixed uncertainty reported with every property
pub const UNCERTAINTY_MS: u32 = 1000;

/// Response body returned to the voice platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,

    pub event: Event,
}

impl ResponseEnvelope {
    /// Error payload type, if this is an error response
    #[must_use]
    pub fn error_type(&self) -> Option<&str> {
        if self.event.header.name != "ErrorResponse" {
            return None;
        }
        self.event.payload.get("type").and_then(serde_json::Value::as_str)
    }
}

/// Event part of a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub header: ResponseHeader,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointEcho>,

    pub payload: serde_json::Value,
}

/// Response header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHeader {
    pub namespace: String,
    pub name: String,
    pub payload_version: String,
    pub message_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

/// Endpoint id echoed back from the directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointEcho {
    pub endpoint_id: String,
}

/// Current property values of an endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub properties: Vec<PropertyReport>,
}

/// A timestamped observation of one capability property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyReport {
    pub namespace: String,
    pub name: String,
    pub value: serde_json::Value,
    pub time_of_sample: DateTime<Utc>,
    pub uncertainty_in_milliseconds: u32,
}

impl PropertyReport {
    /// Create a report with the standard uncertainty
    #[must_use]
    pub fn new(
        namespace: &str,
        name: &str,
        value: serde_json::Value,
        time_of_sample: DateTime<Utc>,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            value,
            time_of_sample,
            uncertainty_in_milliseconds: UNCERTAINTY_MS,
        }
    }
}

/// Builds responses for one directive
///
/// Defaults to the directive's namespace and `<name>.Response`; the
/// correlation token and endpoint id are echoed on every response.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    namespace: String,
    name: String,
    correlation_token: Option<String>,
    endpoint_id: Option<String>,
}

impl ResponseBuilder {
    /// Start a response for a directive
    #[must_use]
    pub fn for_directive(directive: &RawDirective) -> Self {
        Self {
            namespace: directive.header.namespace.clone(),
            name: format!("{}.Response", directive.header.name),
            correlation_token: directive.header.correlation_token.clone(),
            endpoint_id: directive.endpoint.as_ref().map(|e| e.endpoint_id.clone()),
        }
    }

    /// Override namespace and name
    #[must_use]
    pub fn named(mut self, namespace: &str, name: &str) -> Self {
        self.namespace = namespace.to_string();
        self.name = name.to_string();
        self
    }

    /// Build the response
    #[must_use]
    pub fn build(self, payload: serde_json::Value, context: Option<Context>) -> ResponseEnvelope {
        ResponseEnvelope {
            context,
            event: Event {
                header: ResponseHeader {
                    namespace: self.namespace,
                    name: self.name,
                    payload_version: PAYLOAD_VERSION.to_string(),
                    message_id: Uuid::new_v4().to_string(),
                    correlation_token: self.correlation_token,
                },
                endpoint: self.endpoint_id.map(|endpoint_id| EndpointEcho { endpoint_id }),
                payload,
            },
        }
    }

    /// Build an error response
    #[must_use]
    pub fn error(self, err: &DirectiveError) -> ResponseEnvelope {
        self.named(err.namespace(), "ErrorResponse")
            .build(err.payload(), None)
    }
}

/// Completion handle for a directive
///
/// Consumed by `complete`, so a directive can be answered at most once. A
/// responder dropped without completing answers with `INTERNAL_ERROR`, so
/// the caller always receives exactly one envelope.
#[derive(Debug)]
pub struct Responder {
    fallback: Option<ResponseBuilder>,
    tx: Option<oneshot::Sender<ResponseEnvelope>>,
}

impl Responder {
    /// Create a responder for a directive and the receiving half
    #[must_use]
    pub fn for_directive(directive: &RawDirective) -> (Self, oneshot::Receiver<ResponseEnvelope>) {
        let (tx, rx) = oneshot::channel();
        let responder = Self {
            fallback: Some(ResponseBuilder::for_directive(directive)),
            tx: Some(tx),
        };
        (responder, rx)
    }

    /// Deliver the response
    pub fn complete(mut self, response: ResponseEnvelope) {
        self.deliver(response);
    }

    fn deliver(&mut self, response: ResponseEnvelope) {
        if let Some(tx) = self.tx.take()
            && tx.send(response).is_err()
        {
            tracing::debug!("directive caller went away before completion");
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if self.tx.is_none() {
            return;
        }
        tracing::error!("directive dropped without a response");
        if let Some(builder) = self.fallback.take() {
            let err = DirectiveError::Internal("directive was not answered".to_string());
            self.deliver(builder.error(&err));
        }
    }
}
