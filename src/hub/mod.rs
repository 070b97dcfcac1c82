//! FHEM hub transport
//!
//! The hub is driven exclusively through its HTTP command API: every
//! interaction is a single command string (`set ...`, `jsonlist2 ...`,
//! `get ...`) and the reply is either empty, free text, or a `jsonlist2`
//! JSON document.

mod client;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

pub use client::FhemClient;

use crate::Result;

/// Sends one command string to the hub and returns its reply
#[async_trait]
pub trait HubTransport: Send + Sync {
    /// Issue a single command
    ///
    /// # Errors
    ///
    /// Returns `Error::HubUnreachable` if the hub cannot be reached,
    /// `Error::Serialization` for a garbled `jsonlist2` reply, other variants
    /// for transport failures
    async fn send(&self, command: &str) -> Result<HubReply>;
}

/// Parsed hub reply
#[derive(Debug, Clone, PartialEq)]
pub enum HubReply {
    /// Hub answered with an empty body (typical for `set`)
    Empty,
    /// Plain text answer (e.g. `get <dev> activities`)
    Text(String),
    /// `jsonlist2` result set
    Devices(JsonList),
}

impl HubReply {
    /// Device rows of the reply; empty for non-JSON replies
    #[must_use]
    pub fn into_devices(self) -> Vec<DeviceRecord> {
        match self {
            Self::Devices(list) => list.results,
            Self::Empty | Self::Text(_) => Vec::new(),
        }
    }

    /// Text body of the reply, if any
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Empty | Self::Devices(_) => None,
        }
    }
}

/// Parse a raw response body
///
/// A body is treated as JSON when the hub announced a JSON content type or
/// the body looks like a JSON object.
///
/// # Errors
///
/// Returns `Error::Serialization` if a JSON body cannot be decoded
pub fn parse_reply(body: &str, json_content_type: bool) -> Result<HubReply> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(HubReply::Empty);
    }

    if json_content_type || trimmed.starts_with('{') {
        return Ok(HubReply::Devices(serde_json::from_str(trimmed)?));
    }

    Ok(HubReply::Text(body.to_string()))
}

/// `jsonlist2` document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JsonList {
    #[serde(rename = "Results", default)]
    pub results: Vec<DeviceRecord>,
}

/// One device row of a `jsonlist2` reply
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceRecord {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Internals", default)]
    pub internals: HashMap<String, serde_json::Value>,

    #[serde(rename = "Readings", default)]
    pub readings: HashMap<String, Reading>,

    #[serde(rename = "Attributes", default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl DeviceRecord {
    /// Internal value as text (e.g. `STATE`)
    #[must_use]
    pub fn internal(&self, key: &str) -> Option<&str> {
        self.internals.get(key).and_then(serde_json::Value::as_str)
    }

    /// Attribute value as text, `None` when unset or empty
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Reading by name
    #[must_use]
    pub fn reading(&self, key: &str) -> Option<&Reading> {
        self.readings.get(key)
    }
}

/// A reading as reported by the hub: value plus sample time
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reading {
    #[serde(rename = "Value")]
    pub value: serde_json::Value,

    #[serde(rename = "Time", default)]
    pub time: String,
}

/// Timestamp format used by FHEM readings
const READING_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Reading {
    /// Value as text; numbers are rendered
    #[must_use]
    pub fn text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Value as a number, parsing textual values such as `"21.5"`
    #[must_use]
    pub fn number(&self) -> Option<f64> {
        match &self.value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => leading_number(s),
            _ => None,
        }
    }

    /// Sample time; readings without a parseable time count as fresh
    #[must_use]
    pub fn sampled_at(&self) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(self.time.trim(), READING_TIME_FORMAT)
            .map_or_else(|_| Utc::now(), |t| t.and_utc())
    }
}

/// Parse the leading numeric part of a reading, e.g. `"21.5 C"` -> 21.5
fn leading_number(raw: &str) -> Option<f64> {
    let token = raw.split_whitespace().next()?;
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Arg": "jsonlist2 lamp STATE brightness",
        "Results": [
            {
                "Name": "lamp",
                "PossibleSets": "on off dim",
                "Internals": { "STATE": "on", "NAME": "lamp" },
                "Readings": {
                    "brightness": { "Value": "42", "Time": "2024-03-01 18:30:00" }
                },
                "Attributes": { "EchoWord": "Stehlampe", "EchoDesc": "" }
            }
        ],
        "totalResultsReturned": 1
    }"#;

    #[test]
    fn test_parse_jsonlist2() {
        let reply = parse_reply(SAMPLE, true).unwrap();
        let devices = reply.into_devices();
        assert_eq!(devices.len(), 1);

        let lamp = &devices[0];
        assert_eq!(lamp.name, "lamp");
        assert_eq!(lamp.internal("STATE"), Some("on"));
        assert_eq!(lamp.attribute("EchoWord"), Some("Stehlampe"));
        assert_eq!(lamp.attribute("EchoDesc"), None);

        let bri = lamp.reading("brightness").unwrap();
        assert_eq!(bri.number(), Some(42.0));
        assert_eq!(bri.sampled_at().to_rfc3339(), "2024-03-01T18:30:00+00:00");
    }

    #[test]
    fn test_parse_empty_and_text() {
        assert_eq!(parse_reply("", false).unwrap(), HubReply::Empty);
        assert_eq!(parse_reply("  \n", true).unwrap(), HubReply::Empty);

        let text = "0\tTV\n-1\tPowerOff\n";
        assert_eq!(
            parse_reply(text, false).unwrap().into_text().as_deref(),
            Some(text)
        );
    }

    #[test]
    fn test_malformed_json_is_unreachable() {
        let err = parse_reply("{\"Results\": [", true).unwrap_err();
        assert!(matches!(err, crate::Error::Serialization(_)));

        let mapped: crate::alexa::DirectiveError = err.into();
        assert_eq!(
            mapped.error_type(),
            crate::alexa::ErrorType::BridgeUnreachable
        );
    }

    #[test]
    fn test_reading_number_variants() {
        let numeric = Reading {
            value: serde_json::json!(19.5),
            time: String::new(),
        };
        assert_eq!(numeric.number(), Some(19.5));

        let with_unit = Reading {
            value: serde_json::json!("21.5 C"),
            time: "garbage".to_string(),
        };
        assert_eq!(with_unit.number(), Some(21.5));
        assert_eq!(with_unit.text(), "21.5 C");

        let off = Reading {
            value: serde_json::json!("off"),
            time: String::new(),
        };
        assert_eq!(off.number(), None);
    }
}
