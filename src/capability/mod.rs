//! Capability catalog
//!
//! Maps the short capability keys used in the hub's `EchoCap` attribute
//! (`power`, `bri`, `heating`, ...) to the Alexa interface advertised during
//! discovery, the display category the key implies, the readings needed to
//! report its state and the projector turning a device row into property
//! reports.
//!
//! The catalog is built once at startup and shared read-only.

mod projectors;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::alexa::{PlaybackOperation, PropertyReport};
use crate::hub::DeviceRecord;

/// Appends zero or more property reports for one device row
pub type Projector = fn(&DeviceRecord, &mut Vec<PropertyReport>);

/// Fallback display category when nothing more specific is known
pub const DEFAULT_CATEGORY: &str = "OTHER";

/// Interface descriptor as advertised in the discovery payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDescriptor {
    #[serde(rename = "type")]
    pub kind: String,

    pub interface: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<InterfaceProperties>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_deactivation: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proactively_reported: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_operations: Option<Vec<String>>,
}

/// Reportable properties of an interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceProperties {
    pub supported: Vec<SupportedProperty>,
    pub proactively_reported: bool,
    pub retrievable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportedProperty {
    pub name: String,
}

impl InterfaceDescriptor {
    fn alexa(interface: &str) -> Self {
        Self {
            kind: "AlexaInterface".to_string(),
            interface: interface.to_string(),
            version: "3".to_string(),
            properties: None,
            supports_deactivation: None,
            proactively_reported: None,
            supported_operations: None,
        }
    }

    /// Retrievable interface with the given properties
    fn with_properties(interface: &str, names: &[&str], proactively_reported: bool) -> Self {
        Self {
            properties: Some(InterfaceProperties {
                supported: names
                    .iter()
                    .map(|name| SupportedProperty {
                        name: (*name).to_string(),
                    })
                    .collect(),
                proactively_reported,
                retrievable: true,
            }),
            ..Self::alexa(interface)
        }
    }
}

/// Static description of one capability key
#[derive(Debug, Clone)]
pub struct CapabilitySpec {
    pub key: &'static str,
    pub interface: InterfaceDescriptor,
    pub category: Option<&'static str>,
    pub readings: &'static [&'static str],
    pub projector: Projector,
}

/// Immutable registry of supported capabilities
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: HashMap<&'static str, CapabilitySpec>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// Catalog with every capability this gateway supports
    #[must_use]
    pub fn standard() -> Self {
        let playback_ops = PlaybackOperation::ALL
            .iter()
            .map(|op| op.as_str().to_string())
            .collect();

        let specs = [
            CapabilitySpec {
                key: "power",
                interface: InterfaceDescriptor::with_properties(
                    "Alexa.PowerController",
                    &["powerState"],
                    false,
                ),
                category: Some("SWITCH"),
                readings: &["STATE"],
                projector: projectors::power,
            },
            CapabilitySpec {
                key: "color",
                interface: InterfaceDescriptor::with_properties(
                    "Alexa.ColorController",
                    &["color"],
                    false,
                ),
                category: Some("LIGHT"),
                readings: &["brightness", "hue", "saturation"],
                projector: projectors::color,
            },
            CapabilitySpec {
                key: "bri",
                interface: InterfaceDescriptor::with_properties(
                    "Alexa.BrightnessController",
                    &["brightness"],
                    false,
                ),
                category: Some("LIGHT"),
                readings: &["brightness"],
                projector: projectors::brightness,
            },
            CapabilitySpec {
                key: "heating",
                interface: InterfaceDescriptor::with_properties(
                    "Alexa.ThermostatController",
                    &["targetSetpoint", "thermostatMode"],
                    false,
                ),
                category: Some("THERMOSTAT"),
                readings: &["desiredTemperature", "mode"],
                projector: projectors::thermostat,
            },
            CapabilitySpec {
                key: "temp",
                interface: InterfaceDescriptor::with_properties(
                    "Alexa.TemperatureSensor",
                    &["temperature"],
                    false,
                ),
                category: Some("THERMOSTAT"),
                readings: &["temperature"],
                projector: projectors::temperature,
            },
            CapabilitySpec {
                key: "volume",
                interface: InterfaceDescriptor::with_properties(
                    "Alexa.Speaker",
                    &["volume", "muted"],
                    false,
                ),
                category: Some("SPEAKER"),
                readings: &["volume", "mute"],
                projector: projectors::speaker,
            },
            CapabilitySpec {
                key: "contact",
                interface: InterfaceDescriptor::with_properties(
                    "Alexa.ContactSensor",
                    &["detectionState"],
                    false,
                ),
                category: Some("CONTACT_SENSOR"),
                readings: &["state"],
                projector: projectors::contact,
            },
            CapabilitySpec {
                key: "motion",
                interface: InterfaceDescriptor::with_properties(
                    "Alexa.MotionSensor",
                    &["detectionState"],
                    true,
                ),
                category: Some("MOTION_SENSOR"),
                readings: &["state"],
                projector: projectors::motion,
            },
            CapabilitySpec {
                key: "window",
                interface: InterfaceDescriptor::with_properties(
                    "Alexa.LockController",
                    &["lockState"],
                    false,
                ),
                category: Some("SMARTLOCK"),
                readings: &["state"],
                projector: projectors::window_lock,
            },
            CapabilitySpec {
                key: "channel",
                interface: InterfaceDescriptor::with_properties(
                    "Alexa.ChannelController",
                    &["channel"],
                    false,
                ),
                category: Some("TV"),
                readings: &["channel"],
                projector: projectors::channel,
            },
            CapabilitySpec {
                key: "playback",
                interface: InterfaceDescriptor {
                    supported_operations: Some(playback_ops),
                    ..InterfaceDescriptor::alexa("Alexa.PlaybackController")
                },
                category: None,
                readings: &[],
                projector: projectors::none,
            },
            CapabilitySpec {
                key: "scene",
                interface: InterfaceDescriptor {
                    supports_deactivation: Some(true),
                    proactively_reported: Some(false),
                    ..InterfaceDescriptor::alexa("Alexa.SceneController")
                },
                category: Some("ACTIVITY_TRIGGER"),
                readings: &[],
                projector: projectors::none,
            },
        ];

        Self {
            entries: specs.into_iter().map(|spec| (spec.key, spec)).collect(),
        }
    }

    /// Look up a capability key
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&CapabilitySpec> {
        self.entries.get(key)
    }

    /// Display category implied by a capability key
    #[must_use]
    pub fn category(&self, key: &str) -> Option<&'static str> {
        self.lookup(key).and_then(|spec| spec.category)
    }

    /// Number of registered capabilities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
