//! Inbound directives
//!
//! The wire form (`DirectiveEnvelope`) is kept verbatim for building the
//! response; `Directive` is the typed view the dispatcher matches on.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::DirectiveError;

/// Capability key -> backing hub device name, attached to each endpoint
pub type Cookie = BTreeMap<String, String>;

/// Top-level request body as sent by the voice platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveEnvelope {
    pub directive: RawDirective,
}

/// Directive as received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDirective {
    pub header: DirectiveHeader,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointRef>,

    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Directive header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveHeader {
    pub namespace: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

/// Endpoint addressed by a directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRef {
    pub endpoint_id: String,

    #[serde(default)]
    pub cookie: Cookie,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<serde_json::Value>,
}

/// HSB color as used by `Alexa.ColorController`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

/// Temperature with its scale (`CELSIUS`, `FAHRENHEIT`, `KELVIN`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub value: f64,
    pub scale: String,
}

/// `Alexa.PlaybackController` operations, forwarded verbatim to the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOperation {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    StartOver,
    Rewind,
    FastForward,
}

impl PlaybackOperation {
    /// All supported operations, in discovery order
    pub const ALL: [Self; 8] = [
        Self::Play,
        Self::Pause,
        Self::Stop,
        Self::Next,
        Self::Previous,
        Self::StartOver,
        Self::Rewind,
        Self::FastForward,
    ];

    /// Directive name of the operation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Play => "Play",
            Self::Pause => "Pause",
            Self::Stop => "Stop",
            Self::Next => "Next",
            Self::Previous => "Previous",
            Self::StartOver => "StartOver",
            Self::Rewind => "Rewind",
            Self::FastForward => "FastForward",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

/// Every directive this gateway understands
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Discover,
    ReportState,
    Power { on: bool },
    SetColor(Color),
    SetBrightness { brightness: i64 },
    AdjustBrightness { delta: i64 },
    SetTargetTemperature(Temperature),
    AdjustTargetTemperature(Temperature),
    SetThermostatMode { mode: String },
    SetVolume { volume: i64 },
    AdjustVolume { delta: i64, default_magnitude: bool },
    SetMute { mute: bool },
    Playback(PlaybackOperation),
    ChangeChannel { channel: String },
    SkipChannels { count: i64 },
    Lock { lock: bool },
    Scene { activate: bool },
    AcceptGrant { code: String },
}

#[derive(Deserialize)]
struct ColorPayload {
    color: Color,
}

#[derive(Deserialize)]
struct BrightnessPayload {
    brightness: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrightnessDeltaPayload {
    brightness_delta: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetSetpointPayload {
    target_setpoint: Temperature,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetpointDeltaPayload {
    target_setpoint_delta: Temperature,
}

#[derive(Deserialize)]
struct ModeValue {
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThermostatModePayload {
    thermostat_mode: ModeValue,
}

#[derive(Deserialize)]
struct VolumePayload {
    volume: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeDeltaPayload {
    volume: i64,
    #[serde(default)]
    volume_default: bool,
}

#[derive(Deserialize)]
struct MutePayload {
    mute: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelPayload {
    #[serde(default)]
    channel: ChannelSpec,
    #[serde(default)]
    channel_metadata: Option<ChannelMetadata>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelSpec {
    number: Option<String>,
    call_sign: Option<String>,
    affiliate_call_sign: Option<String>,
}

#[derive(Deserialize)]
struct ChannelMetadata {
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkipChannelsPayload {
    channel_count: i64,
}

#[derive(Deserialize)]
struct Grant {
    code: String,
}

#[derive(Deserialize)]
struct AcceptGrantPayload {
    grant: Grant,
}

fn payload_of<T: DeserializeOwned>(
    namespace: &str,
    name: &str,
    payload: &serde_json::Value,
) -> Result<T, DirectiveError> {
    T::deserialize(payload).map_err(|e| {
        DirectiveError::InvalidDirective(format!("malformed {namespace}::{name} payload: {e}"))
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Directive {
    /// Resolve a namespace/name pair and its payload into a typed directive
    ///
    /// # Errors
    ///
    /// Returns `DirectiveError::InvalidDirective` for unsupported pairs and
    /// payloads missing a required field
    pub fn parse(
        namespace: &str,
        name: &str,
        payload: &serde_json::Value,
    ) -> Result<Self, DirectiveError> {
        let directive = match (namespace, name) {
            ("Alexa.Discovery", "Discover") => Self::Discover,
            ("Alexa.Discovery", _) => {
                return Err(DirectiveError::InvalidDirective(
                    "only Discover is supported in namespace Alexa.Discovery".to_string(),
                ));
            }
            ("Alexa", "ReportState") => Self::ReportState,
            ("Alexa.PowerController", "TurnOn") => Self::Power { on: true },
            ("Alexa.PowerController", "TurnOff") => Self::Power { on: false },
            ("Alexa.ColorController", "SetColor") => {
                let p: ColorPayload = payload_of(namespace, name, payload)?;
                Self::SetColor(p.color)
            }
            ("Alexa.BrightnessController", "SetBrightness") => {
                let p: BrightnessPayload = payload_of(namespace, name, payload)?;
                Self::SetBrightness {
                    brightness: p.brightness,
                }
            }
            ("Alexa.BrightnessController", "AdjustBrightness") => {
                let p: BrightnessDeltaPayload = payload_of(namespace, name, payload)?;
                Self::AdjustBrightness {
                    delta: p.brightness_delta,
                }
            }
            ("Alexa.ThermostatController", "SetTargetTemperature") => {
                let p: TargetSetpointPayload = payload_of(namespace, name, payload)?;
                Self::SetTargetTemperature(p.target_setpoint)
            }
            ("Alexa.ThermostatController", "AdjustTargetTemperature") => {
                let p: SetpointDeltaPayload = payload_of(namespace, name, payload)?;
                Self::AdjustTargetTemperature(p.target_setpoint_delta)
            }
            ("Alexa.ThermostatController", "SetThermostatMode") => {
                let p: ThermostatModePayload = payload_of(namespace, name, payload)?;
                Self::SetThermostatMode {
                    mode: p.thermostat_mode.value,
                }
            }
            ("Alexa.Speaker", "SetVolume") => {
                let p: VolumePayload = payload_of(namespace, name, payload)?;
                Self::SetVolume { volume: p.volume }
            }
            ("Alexa.Speaker", "AdjustVolume") => {
                let p: VolumeDeltaPayload = payload_of(namespace, name, payload)?;
                Self::AdjustVolume {
                    delta: p.volume,
                    default_magnitude: p.volume_default,
                }
            }
            ("Alexa.Speaker", "SetMute") => {
                let p: MutePayload = payload_of(namespace, name, payload)?;
                Self::SetMute { mute: p.mute }
            }
            ("Alexa.PlaybackController", op) => match PlaybackOperation::from_name(op) {
                Some(op) => Self::Playback(op),
                None => return Err(unsupported(namespace, name)),
            },
            ("Alexa.ChannelController", "ChangeChannel") => {
                let p: ChannelPayload = payload_of(namespace, name, payload)?;
                let channel = non_empty(p.channel.number)
                    .or_else(|| non_empty(p.channel_metadata.and_then(|m| m.name)))
                    .or_else(|| non_empty(p.channel.call_sign))
                    .or_else(|| non_empty(p.channel.affiliate_call_sign))
                    .ok_or_else(|| {
                        DirectiveError::InvalidDirective(
                            "ChangeChannel without channel number or name".to_string(),
                        )
                    })?;
                Self::ChangeChannel { channel }
            }
            ("Alexa.ChannelController", "SkipChannels") => {
                let p: SkipChannelsPayload = payload_of(namespace, name, payload)?;
                Self::SkipChannels {
                    count: p.channel_count,
                }
            }
            ("Alexa.LockController", "Lock") => Self::Lock { lock: true },
            ("Alexa.LockController", "Unlock") => Self::Lock { lock: false },
            ("Alexa.SceneController", "Activate") => Self::Scene { activate: true },
            ("Alexa.SceneController", "Deactivate") => Self::Scene { activate: false },
            ("Alexa.Authorization", "AcceptGrant") => {
                let p: AcceptGrantPayload = payload_of(namespace, name, payload)?;
                Self::AcceptGrant { code: p.grant.code }
            }
            _ => return Err(unsupported(namespace, name)),
        };

        Ok(directive)
    }
}

fn unsupported(namespace: &str, name: &str) -> DirectiveError {
    DirectiveError::InvalidDirective(format!("not supported: {namespace}::{name}"))
}
