//! Device row -> property report projections
//!
//! Each projector is pure and tolerates missing readings: a sensor that has
//! not reported yet simply contributes nothing.

use serde_json::{Value, json};

use crate::alexa::PropertyReport;
use crate::hub::DeviceRecord;

/// Render a number as an integer when it has no fractional part
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

fn celsius(value: f64) -> Value {
    json!({ "value": value, "scale": "CELSIUS" })
}

pub(super) fn power(dev: &DeviceRecord, out: &mut Vec<PropertyReport>) {
    let Some(state) = dev.internal("STATE") else {
        return;
    };
    let value = if state == "off" { "OFF" } else { "ON" };
    out.push(PropertyReport::new(
        "Alexa.PowerController",
        "powerState",
        json!(value),
        chrono::Utc::now(),
    ));
}

pub(super) fn color(dev: &DeviceRecord, out: &mut Vec<PropertyReport>) {
    let (Some(hue), Some(sat), Some(bri)) = (
        dev.reading("hue"),
        dev.reading("saturation"),
        dev.reading("brightness"),
    ) else {
        return;
    };
    let (Some(h), Some(s), Some(b)) = (hue.number(), sat.number(), bri.number()) else {
        return;
    };
    out.push(PropertyReport::new(
        "Alexa.ColorController",
        "color",
        json!({
            "hue": number_value(h),
            "saturation": s / 100.0,
            "brightness": b / 100.0,
        }),
        hue.sampled_at(),
    ));
}

pub(super) fn brightness(dev: &DeviceRecord, out: &mut Vec<PropertyReport>) {
    let Some(reading) = dev.reading("brightness") else {
        return;
    };
    let Some(value) = reading.number() else {
        return;
    };
    out.push(PropertyReport::new(
        "Alexa.BrightnessController",
        "brightness",
        number_value(value),
        reading.sampled_at(),
    ));
}

/// Hub thermostat mode -> Alexa mode
fn alexa_mode(mode: &str) -> Option<&'static str> {
    match mode {
        "manual" => Some("HEAT"),
        "auto" => Some("AUTO"),
        "eco" => Some("ECO"),
        "off" => Some("OFF"),
        _ => None,
    }
}

pub(super) fn thermostat(dev: &DeviceRecord, out: &mut Vec<PropertyReport>) {
    const NS: &str = "Alexa.ThermostatController";

    let Some(desired) = dev.reading("desiredTemperature") else {
        return;
    };

    if desired.text() == "off" {
        out.push(PropertyReport::new(
            NS,
            "thermostatMode",
            json!("OFF"),
            desired.sampled_at(),
        ));
        return;
    }

    let Some(setpoint) = desired.number() else {
        tracing::debug!(device = %dev.name, value = %desired.text(), "non-numeric setpoint");
        return;
    };
    out.push(PropertyReport::new(
        NS,
        "targetSetpoint",
        celsius(setpoint),
        desired.sampled_at(),
    ));

    if let Some(mode) = dev.reading("mode")
        && let Some(value) = alexa_mode(&mode.text())
    {
        out.push(PropertyReport::new(
            NS,
            "thermostatMode",
            json!(value),
            mode.sampled_at(),
        ));
    }
}

pub(super) fn temperature(dev: &DeviceRecord, out: &mut Vec<PropertyReport>) {
    let Some(reading) = dev.reading("temperature") else {
        return;
    };
    let Some(value) = reading.number() else {
        return;
    };
    out.push(PropertyReport::new(
        "Alexa.TemperatureSensor",
        "temperature",
        celsius(value),
        reading.sampled_at(),
    ));
}

pub(super) fn speaker(dev: &DeviceRecord, out: &mut Vec<PropertyReport>) {
    if let Some(volume) = dev.reading("volume")
        && let Some(value) = volume.number()
    {
        out.push(PropertyReport::new(
            "Alexa.Speaker",
            "volume",
            number_value(value),
            volume.sampled_at(),
        ));
    }

    if let Some(mute) = dev.reading("mute") {
        out.push(PropertyReport::new(
            "Alexa.Speaker",
            "muted",
            json!(mute.text() == "on"),
            mute.sampled_at(),
        ));
    }
}

/// Project the `state` reading through a value mapping
fn state_report(
    dev: &DeviceRecord,
    out: &mut Vec<PropertyReport>,
    namespace: &str,
    name: &str,
    map: fn(&str) -> &'static str,
) {
    let Some(reading) = dev.reading("state") else {
        return;
    };
    out.push(PropertyReport::new(
        namespace,
        name,
        json!(map(&reading.text())),
        reading.sampled_at(),
    ));
}

pub(super) fn contact(dev: &DeviceRecord, out: &mut Vec<PropertyReport>) {
    state_report(dev, out, "Alexa.ContactSensor", "detectionState", |s| {
        if s == "closed" { "DETECTED" } else { "NOT_DETECTED" }
    });
}

pub(super) fn motion(dev: &DeviceRecord, out: &mut Vec<PropertyReport>) {
    state_report(dev, out, "Alexa.MotionSensor", "detectionState", |s| {
        if s == "on" { "DETECTED" } else { "NOT_DETECTED" }
    });
}

pub(super) fn window_lock(dev: &DeviceRecord, out: &mut Vec<PropertyReport>) {
    state_report(dev, out, "Alexa.LockController", "lockState", |s| {
        if s == "closed" { "LOCKED" } else { "UNLOCKED" }
    });
}

pub(super) fn channel(dev: &DeviceRecord, out: &mut Vec<PropertyReport>) {
    let Some(reading) = dev.reading("channel") else {
        return;
    };
    out.push(PropertyReport::new(
        "Alexa.ChannelController",
        "channel",
        json!({ "number": reading.text() }),
        reading.sampled_at(),
    ));
}

/// Capabilities without retrievable state
pub(super) fn none(_dev: &DeviceRecord, _out: &mut Vec<PropertyReport>) {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn device(value: serde_json::Value) -> DeviceRecord {
        serde_json::from_value(value).unwrap()
    }

    fn project(projector: super::super::Projector, dev: &DeviceRecord) -> Vec<PropertyReport> {
        let mut out = Vec::new();
        projector(dev, &mut out);
        out
    }

    #[test]
    fn test_power() {
        let on = device(json!({ "Name": "lamp", "Internals": { "STATE": "dim 40%" } }));
        assert_eq!(project(power, &on)[0].value, "ON");

        let off = device(json!({ "Name": "lamp", "Internals": { "STATE": "off" } }));
        assert_eq!(project(power, &off)[0].value, "OFF");

        let unknown = device(json!({ "Name": "lamp" }));
        assert!(project(power, &unknown).is_empty());
    }

    #[test]
    fn test_color_scales_percentages() {
        let dev = device(json!({
            "Name": "bulb",
            "Readings": {
                "hue": { "Value": "120", "Time": "2024-03-01 10:00:00" },
                "saturation": { "Value": "50", "Time": "2024-03-01 10:00:00" },
                "brightness": { "Value": "80", "Time": "2024-03-01 10:00:00" }
            }
        }));
        let props = project(color, &dev);
        assert_eq!(props.len(), 1);
        assert_eq!(
            props[0].value,
            json!({ "hue": 120, "saturation": 0.5, "brightness": 0.8 })
        );
    }

    #[test]
    fn test_color_requires_all_components() {
        let dev = device(json!({
            "Name": "bulb",
            "Readings": { "brightness": { "Value": "80", "Time": "" } }
        }));
        assert!(project(color, &dev).is_empty());
    }

    #[test]
    fn test_thermostat_setpoint_and_mode() {
        let dev = device(json!({
            "Name": "heater",
            "Readings": {
                "desiredTemperature": { "Value": "21.5", "Time": "2024-03-01 10:00:00" },
                "mode": { "Value": "manual", "Time": "2024-03-01 09:00:00" }
            }
        }));
        let props = project(thermostat, &dev);
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].name, "targetSetpoint");
        assert_eq!(props[0].value, json!({ "value": 21.5, "scale": "CELSIUS" }));
        assert_eq!(props[1].name, "thermostatMode");
        assert_eq!(props[1].value, "HEAT");
    }

    #[test]
    fn test_thermostat_off_reports_mode_only() {
        let dev = device(json!({
            "Name": "heater",
            "Readings": {
                "desiredTemperature": { "Value": "off", "Time": "2024-03-01 10:00:00" },
                "mode": { "Value": "manual", "Time": "2024-03-01 09:00:00" }
            }
        }));
        let props = project(thermostat, &dev);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "thermostatMode");
        assert_eq!(props[0].value, "OFF");
    }

    #[test]
    fn test_thermostat_without_mode_reading() {
        let dev = device(json!({
            "Name": "heater",
            "Readings": {
                "desiredTemperature": { "Value": 19, "Time": "2024-03-01 10:00:00" }
            }
        }));
        let props = project(thermostat, &dev);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].value["value"], 19.0);
    }

    #[test]
    fn test_speaker_tolerates_partial_readings() {
        let dev = device(json!({
            "Name": "avr",
            "Readings": { "mute": { "Value": "on", "Time": "2024-03-01 10:00:00" } }
        }));
        let props = project(speaker, &dev);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "muted");
        assert_eq!(props[0].value, true);
    }

    #[test]
    fn test_state_mappings() {
        let closed = device(json!({
            "Name": "window",
            "Readings": { "state": { "Value": "closed", "Time": "2024-03-01 10:00:00" } }
        }));
        assert_eq!(project(window_lock, &closed)[0].value, "LOCKED");
        assert_eq!(project(contact, &closed)[0].value, "DETECTED");
        assert_eq!(project(motion, &closed)[0].value, "NOT_DETECTED");

        let open = device(json!({
            "Name": "window",
            "Readings": { "state": { "Value": "open", "Time": "2024-03-01 10:00:00" } }
        }));
        assert_eq!(project(window_lock, &open)[0].value, "UNLOCKED");
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value(42.0), json!(42));
        assert_eq!(number_value(21.5), json!(21.5));
    }
}
