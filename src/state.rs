//! State reporting
//!
//! Turns an endpoint cookie into one combined `jsonlist2` query, runs the
//! capability projectors over the returned rows and optionally patches the
//! result with a just-commanded target value.

use serde_json::json;

use crate::alexa::{Color, Cookie, DirectiveError, PropertyReport};
use crate::capability::{Catalog, CapabilitySpec};
use crate::hub::HubTransport;

/// Optimistic override applied after the hub readback
///
/// The hub's readback may still show the pre-command value, so writes of
/// these properties report the commanded target instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Replace `color`
    Color(Color),
    /// Replace `brightness`
    Brightness(i64),
    /// Replace the value of `targetSetpoint`
    TargetSetpoint(f64),
    /// Add to the value of `targetSetpoint`
    TargetSetpointDelta(f64),
}

impl Patch {
    /// Apply to matching properties, stamping them with the current time
    pub fn apply(&self, properties: &mut [PropertyReport]) {
        let now = chrono::Utc::now();
        for prop in properties.iter_mut() {
            match self {
                Self::Color(color) if prop.name == "color" => {
                    prop.value = json!(color);
                }
                Self::Brightness(value) if prop.name == "brightness" => {
                    prop.value = json!(value);
                }
                Self::TargetSetpoint(value) if prop.name == "targetSetpoint" => {
                    prop.value["value"] = json!(value);
                }
                Self::TargetSetpointDelta(delta) if prop.name == "targetSetpoint" => {
                    let current = prop.value["value"].as_f64().unwrap_or_default();
                    prop.value["value"] = json!(current + delta);
                }
                _ => continue,
            }
            prop.time_of_sample = now;
        }
    }
}

/// Devices and readings to query for one cookie
#[derive(Debug, Default)]
pub struct StateQuery<'c> {
    /// Device name -> capabilities it backs, in first-appearance order
    pub devices: Vec<(String, Vec<&'c CapabilitySpec>)>,
    /// Union of required readings, in first-appearance order
    pub readings: Vec<&'static str>,
}

impl<'c> StateQuery<'c> {
    /// Group cookie entries by backing device
    ///
    /// Keys unknown to the catalog and capabilities without readings are
    /// left out.
    #[must_use]
    pub fn plan(catalog: &'c Catalog, cookie: &Cookie) -> Self {
        let mut query = Self::default();

        for (key, device) in cookie {
            let Some(spec) = catalog.lookup(key) else {
                tracing::debug!(key = %key, "cookie key without capability, skipping");
                continue;
            };
            if spec.readings.is_empty() {
                continue;
            }

            match query.devices.iter_mut().find(|(name, _)| name == device) {
                Some((_, specs)) => specs.push(spec),
                None => query.devices.push((device.clone(), vec![spec])),
            }

            for &reading in spec.readings {
                if !query.readings.contains(&reading) {
                    query.readings.push(reading);
                }
            }
        }

        query
    }

    /// Whether nothing needs to be read from the hub
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// The `jsonlist2` command, optionally prefixed by a write
    #[must_use]
    pub fn command(&self, prefix: Option<&str>) -> String {
        let devices: Vec<&str> = self.devices.iter().map(|(name, _)| name.as_str()).collect();
        format!(
            "{}jsonlist2 {} {}",
            prefix.unwrap_or_default(),
            devices.join(","),
            self.readings.join(" ")
        )
    }

    fn projectors_for(&self, device: &str) -> Option<&[&'c CapabilitySpec]> {
        self.devices
            .iter()
            .find(|(name, _)| name == device)
            .map(|(_, specs)| specs.as_slice())
    }
}

/// Builds property contexts from the hub
pub struct StateReporter<'a> {
    hub: &'a dyn HubTransport,
    catalog: &'a Catalog,
}

impl<'a> StateReporter<'a> {
    #[must_use]
    pub fn new(hub: &'a dyn HubTransport, catalog: &'a Catalog) -> Self {
        Self { hub, catalog }
    }

    /// Report the current state of every capability in `cookie`
    ///
    /// `command` is sent in the same round trip, ahead of the query.
    ///
    /// # Errors
    ///
    /// Returns `BridgeUnreachable` if the hub returns no rows, or the mapped
    /// transport error
    pub async fn report_state(
        &self,
        cookie: &Cookie,
        command: Option<&str>,
        patch: Option<&Patch>,
    ) -> Result<Vec<PropertyReport>, DirectiveError> {
        let query = StateQuery::plan(self.catalog, cookie);

        if query.is_empty() {
            if let Some(command) = command {
                self.hub.send(command).await?;
            }
            return Ok(Vec::new());
        }

        let rows = self.hub.send(&query.command(command)).await?.into_devices();
        if rows.is_empty() {
            return Err(DirectiveError::BridgeUnreachable(
                "no answer from hub".to_string(),
            ));
        }

        let mut properties = Vec::new();
        for row in &rows {
            match query.projectors_for(&row.name) {
                Some(specs) => {
                    for spec in specs {
                        (spec.projector)(row, &mut properties);
                    }
                }
                None => tracing::warn!(device = %row.name, "hub returned unrequested device"),
            }
        }

        for (device, _) in &query.devices {
            if !rows.iter().any(|row| &row.name == device) {
                tracing::warn!(device = %device, "device missing from hub reply");
            }
        }

        if let Some(patch) = patch {
            patch.apply(&mut properties);
        }

        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(pairs: &[(&str, &str)]) -> Cookie {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_plan_groups_by_device() {
        let catalog = Catalog::standard();
        let cookie = cookie(&[
            ("bri", "lamp"),
            ("color", "lamp"),
            ("power", "lamp_switch"),
            ("scene", "harmony"),
            ("toaster", "kitchen"),
        ]);

        let query = StateQuery::plan(&catalog, &cookie);
        let devices: Vec<&str> = query.devices.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(devices, ["lamp", "lamp_switch"]);
        assert_eq!(query.devices[0].1.len(), 2);
        assert_eq!(query.readings, ["brightness", "hue", "saturation", "STATE"]);
        assert_eq!(
            query.command(Some("set lamp dim 42;")),
            "set lamp dim 42;jsonlist2 lamp,lamp_switch brightness hue saturation STATE"
        );
    }

    #[test]
    fn test_plan_without_readings_is_empty() {
        let catalog = Catalog::standard();
        let query = StateQuery::plan(&catalog, &cookie(&[("playback", "tv")]));
        assert!(query.is_empty());
    }

    #[test]
    fn test_patch_brightness() {
        let mut props = vec![
            PropertyReport::new(
                "Alexa.BrightnessController",
                "brightness",
                json!(10),
                chrono::DateTime::UNIX_EPOCH,
            ),
            PropertyReport::new(
                "Alexa.PowerController",
                "powerState",
                json!("ON"),
                chrono::DateTime::UNIX_EPOCH,
            ),
        ];
        Patch::Brightness(42).apply(&mut props);

        assert_eq!(props[0].value, json!(42));
        assert!(props[0].time_of_sample > chrono::DateTime::UNIX_EPOCH);
        assert_eq!(props[1].time_of_sample, chrono::DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_patch_setpoint_delta() {
        let mut props = vec![PropertyReport::new(
            "Alexa.ThermostatController",
            "targetSetpoint",
            json!({ "value": 20.0, "scale": "CELSIUS" }),
            chrono::DateTime::UNIX_EPOCH,
        )];
        Patch::TargetSetpointDelta(1.5).apply(&mut props);
        assert_eq!(props[0].value, json!({ "value": 21.5, "scale": "CELSIUS" }));
    }
}
