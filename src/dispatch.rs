//! Directive dispatcher
//!
//! Parses an inbound directive, turns it into a hub command and confirms
//! the result with a state query sent in the same round trip.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::alexa::{
    Context, Cookie, Directive, DirectiveEnvelope, DirectiveError, EndpointRef, PropertyReport,
    RawDirective, Responder, ResponseBuilder, ResponseEnvelope, Temperature,
};
use crate::capability::Catalog;
use crate::config::{DEFAULT_GATEWAY_DEVICE, DEFAULT_SETTLE_MS, HubConfig};
use crate::discovery;
use crate::hub::HubTransport;
use crate::state::{Patch, StateReporter};

/// Routes directives to the hub
pub struct Dispatcher {
    hub: Arc<dyn HubTransport>,
    catalog: Arc<Catalog>,
    gateway_device: String,
    settle_delay: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with default gateway device and settle delay
    #[must_use]
    pub fn new(hub: Arc<dyn HubTransport>, catalog: Arc<Catalog>) -> Self {
        Self {
            hub,
            catalog,
            gateway_device: DEFAULT_GATEWAY_DEVICE.to_string(),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }

    /// Create a dispatcher using the hub settings from configuration
    #[must_use]
    pub fn from_config(
        hub: Arc<dyn HubTransport>,
        catalog: Arc<Catalog>,
        config: &HubConfig,
    ) -> Self {
        Self::new(hub, catalog)
            .with_gateway_device(&config.gateway_device)
            .with_settle_delay(config.settle_delay)
    }

    /// Device receiving authorization grant codes
    #[must_use]
    pub fn with_gateway_device(mut self, device: &str) -> Self {
        self.gateway_device = device.to_string();
        self
    }

    /// Wait between a thermostat mode change and its readback
    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Handle a directive on a separate task and wait for its response
    pub async fn respond(self: &Arc<Self>, envelope: DirectiveEnvelope) -> ResponseEnvelope {
        let (responder, rx) = Responder::for_directive(&envelope.directive);
        let fallback = ResponseBuilder::for_directive(&envelope.directive);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.dispatch(&envelope, responder).await;
        });

        match rx.await {
            Ok(response) => response,
            Err(_) => fallback.error(&DirectiveError::Internal(
                "directive handler vanished".to_string(),
            )),
        }
    }

    /// Handle a directive and complete its responder
    pub async fn dispatch(&self, envelope: &DirectiveEnvelope, responder: Responder) {
        responder.complete(self.handle(envelope).await);
    }

    /// Handle a directive
    ///
    /// Failures are folded into an error envelope, so the result is always
    /// a well-formed response.
    pub async fn handle(&self, envelope: &DirectiveEnvelope) -> ResponseEnvelope {
        let raw = &envelope.directive;
        let builder = ResponseBuilder::for_directive(raw);

        tracing::debug!(
            namespace = %raw.header.namespace,
            name = %raw.header.name,
            endpoint = ?raw.endpoint.as_ref().map(|e| &e.endpoint_id),
            "handling directive"
        );

        match self.execute(raw, builder.clone()).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    namespace = %raw.header.namespace,
                    name = %raw.header.name,
                    error_type = ?err.error_type(),
                    error = %err,
                    "directive failed"
                );
                builder.error(&err)
            }
        }
    }

    async fn execute(
        &self,
        raw: &RawDirective,
        builder: ResponseBuilder,
    ) -> Result<ResponseEnvelope, DirectiveError> {
        let directive = Directive::parse(&raw.header.namespace, &raw.header.name, &raw.payload)?;
        let cookie = || cookie_of(raw);

        let (command, patch) = match directive {
            Directive::Discover => {
                let endpoints = discovery::discover(self.hub.as_ref(), &self.catalog).await?;
                return Ok(builder
                    .named("Alexa.Discovery", "Discover.Response")
                    .build(json!({ "endpoints": endpoints }), None));
            }
            Directive::AcceptGrant { code } => {
                self.accept_grant(&code).await?;
                return Ok(builder
                    .named("Alexa.Authorization", "AcceptGrant.Response")
                    .build(json!({}), None));
            }
            Directive::ReportState => {
                let properties = self.reporter().report_state(cookie()?, None, None).await?;
                return Ok(builder
                    .named("Alexa", "StateReport")
                    .build(json!({}), Some(Context { properties })));
            }
            Directive::Lock { lock } => {
                // window contacts cannot be driven, answer with what they report
                tracing::info!(lock, "lock request answered with current state");
                let properties = self.reporter().report_state(cookie()?, None, None).await?;
                return Ok(controller_response(builder, properties));
            }
            Directive::Scene { activate } => {
                let endpoint = raw.endpoint.as_ref().ok_or_else(|| {
                    DirectiveError::InvalidDirective("directive without endpoint".to_string())
                })?;
                return self.scene(endpoint, activate, builder).await;
            }
            Directive::SetThermostatMode { mode } => {
                return self.thermostat_mode(cookie()?, &mode, builder).await;
            }
            Directive::Power { on } => {
                let dev = device(cookie()?, "power")?;
                (format!("set {dev} {};", on_off(on)), None)
            }
            Directive::SetColor(color) => {
                let dev = device(cookie()?, "color")?;
                (
                    format!(
                        "set {dev} hsv {},{},{};",
                        color.hue.round(),
                        (color.saturation * 100.0).round(),
                        (color.brightness * 100.0).round()
                    ),
                    Some(Patch::Color(color)),
                )
            }
            Directive::SetBrightness { brightness } => {
                let dev = device(cookie()?, "bri")?;
                (
                    format!("set {dev} dim {brightness};"),
                    Some(Patch::Brightness(brightness)),
                )
            }
            Directive::AdjustBrightness { delta } => {
                let dev = device(cookie()?, "bri")?;
                (
                    format!("set {dev} dim {{(ReadingsVal($DEV,\"brightness\",0) + {delta})}};"),
                    None,
                )
            }
            Directive::SetTargetTemperature(target) => {
                require_celsius(&target)?;
                let dev = device(cookie()?, "heating")?;
                (
                    format!("set {dev} desiredTemperature {};", target.value),
                    Some(Patch::TargetSetpoint(target.value)),
                )
            }
            Directive::AdjustTargetTemperature(delta) => {
                require_celsius(&delta)?;
                let dev = device(cookie()?, "heating")?;
                (
                    format!(
                        "set {dev} desiredTemperature {{(ReadingsVal($DEV,'desiredTemperature','18')+ {})}};",
                        delta.value
                    ),
                    Some(Patch::TargetSetpointDelta(delta.value)),
                )
            }
            Directive::SetVolume { volume } => {
                let dev = device(cookie()?, "volume")?;
                (format!("set {dev} volume {volume};"), None)
            }
            Directive::AdjustVolume {
                delta,
                default_magnitude,
            } => {
                let dev = device(cookie()?, "volume")?;
                let delta = if default_magnitude {
                    default_volume_step(delta)
                } else {
                    delta
                };
                (
                    format!("set {dev} volume {{( ReadingsVal($DEV,\"volume\",0) + {delta} )}};"),
                    None,
                )
            }
            Directive::SetMute { mute } => {
                let dev = device(cookie()?, "volume")?;
                (format!("set {dev} mute {};", on_off(mute)), None)
            }
            Directive::Playback(op) => {
                let dev = device(cookie()?, "playback")?;
                (format!("set {dev} {};", op.as_str()), None)
            }
            Directive::ChangeChannel { channel } => {
                let dev = device(cookie()?, "channel")?;
                (format!("set {dev} channel {channel};"), None)
            }
            Directive::SkipChannels { count } => {
                let dev = device(cookie()?, "channel")?;
                (
                    format!("set {dev} channel {{(ReadingsVal($DEV,\"channel\",0) + {count})}};"),
                    None,
                )
            }
        };

        tracing::info!(command = %command, "sending command");
        let properties = self
            .reporter()
            .report_state(cookie()?, Some(&command), patch.as_ref())
            .await?;
        Ok(controller_response(builder, properties))
    }

    fn reporter(&self) -> StateReporter<'_> {
        StateReporter::new(self.hub.as_ref(), &self.catalog)
    }

    async fn thermostat_mode(
        &self,
        cookie: &Cookie,
        mode: &str,
        builder: ResponseBuilder,
    ) -> Result<ResponseEnvelope, DirectiveError> {
        let target = match mode {
            "OFF" => "off",
            "AUTO" => "auto",
            "HEAT" => "manual comfort",
            "ECO" => "manual eco",
            other => {
                return Err(DirectiveError::UnsupportedThermostatMode(other.to_string()));
            }
        };
        let dev = device(cookie, "heating")?;

        let command = format!("set {dev} desiredTemperature {target};");
        tracing::info!(command = %command, "sending command");
        self.hub.send(&command).await?;

        tokio::time::sleep(self.settle_delay).await;

        let properties = self.reporter().report_state(cookie, None, None).await?;
        Ok(controller_response(builder, properties))
    }

    async fn scene(
        &self,
        endpoint: &EndpointRef,
        activate: bool,
        builder: ResponseBuilder,
    ) -> Result<ResponseEnvelope, DirectiveError> {
        let dev = device(&endpoint.cookie, "scene")?;
        let command = if activate {
            let id = discovery::scene_activity(&endpoint.endpoint_id).ok_or_else(|| {
                DirectiveError::Internal(format!(
                    "endpoint {} names no activity",
                    endpoint.endpoint_id
                ))
            })?;
            format!("set {dev} activity {id}")
        } else {
            format!("set {dev} off")
        };

        tracing::info!(command = %command, "sending command");
        self.hub.send(&command).await?;

        let name = if activate {
            "ActivationStarted"
        } else {
            "DeactivationStarted"
        };
        Ok(builder.named("Alexa.SceneController", name).build(
            json!({
                "cause": { "type": "VOICE_INTERACTION" },
                "timestamp": chrono::Utc::now(),
            }),
            Some(Context::default()),
        ))
    }

    async fn accept_grant(&self, code: &str) -> Result<(), DirectiveError> {
        let command = format!("set {} code {code}", self.gateway_device);
        self.hub.send(&command).await.map_err(|e| {
            DirectiveError::AcceptGrantFailed(format!("failed to hand over grant: {e}"))
        })?;
        tracing::info!(device = %self.gateway_device, "authorization grant accepted");
        Ok(())
    }
}

fn controller_response(
    builder: ResponseBuilder,
    properties: Vec<PropertyReport>,
) -> ResponseEnvelope {
    builder
        .named("Alexa", "Response")
        .build(json!({}), Some(Context { properties }))
}

fn cookie_of(raw: &RawDirective) -> Result<&Cookie, DirectiveError> {
    raw.endpoint
        .as_ref()
        .map(|endpoint| &endpoint.cookie)
        .ok_or_else(|| DirectiveError::InvalidDirective("directive without endpoint".to_string()))
}

/// Backing device for a capability key
fn device<'c>(cookie: &'c Cookie, key: &str) -> Result<&'c str, DirectiveError> {
    cookie
        .get(key)
        .map(String::as_str)
        .filter(|dev| !dev.is_empty())
        .ok_or_else(|| DirectiveError::Internal(format!("no {key} device in cookie")))
}

fn require_celsius(temperature: &Temperature) -> Result<(), DirectiveError> {
    if temperature.scale == "CELSIUS" {
        Ok(())
    } else {
        Err(DirectiveError::TemperatureOutOfRange(
            temperature.scale.clone(),
        ))
    }
}

const fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Scale the platform's default volume step down by five
///
/// Rounds half away from zero, so small steps still move the volume.
const fn default_volume_step(delta: i64) -> i64 {
    (delta + 2 * delta.signum()) / 5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_volume_step() {
        assert_eq!(default_volume_step(-10), -2);
        assert_eq!(default_volume_step(-3), -1);
        assert_eq!(default_volume_step(3), 1);
        assert_eq!(default_volume_step(2), 0);
        assert_eq!(default_volume_step(12), 2);
        assert_eq!(default_volume_step(13), 3);
        assert_eq!(default_volume_step(0), 0);
    }

    #[test]
    fn test_device_lookup() {
        let mut cookie = Cookie::new();
        cookie.insert("bri".to_string(), "lamp".to_string());
        cookie.insert("power".to_string(), String::new());

        assert_eq!(device(&cookie, "bri").unwrap(), "lamp");
        assert!(matches!(
            device(&cookie, "power"),
            Err(DirectiveError::Internal(_))
        ));
        assert!(matches!(
            device(&cookie, "volume"),
            Err(DirectiveError::Internal(_))
        ));
    }

    #[test]
    fn test_require_celsius() {
        let ok = Temperature {
            value: 21.0,
            scale: "CELSIUS".to_string(),
        };
        let bad = Temperature {
            value: 70.0,
            scale: "FAHRENHEIT".to_string(),
        };
        assert!(require_celsius(&ok).is_ok());
        assert_eq!(
            require_celsius(&bad),
            Err(DirectiveError::TemperatureOutOfRange("FAHRENHEIT".to_string()))
        );
    }
}
