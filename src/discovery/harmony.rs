//! Harmony hub activities exposed as scene endpoints

use std::sync::LazyLock;

use regex::Regex;

use super::{Endpoint, scene_endpoint_id};
use crate::alexa::Cookie;
use crate::capability::Catalog;
use crate::hub::{DeviceRecord, HubTransport};

const HARMONY_QUERY: &str = "jsonlist2 EchoCap=harmony EchoDesc";
const MANUFACTURER: &str = "FHEM harmony";
const CATEGORY: &str = "ACTIVITY_TRIGGER";

/// `<index>\t<name> ...`
static ACTIVITY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+)\t([^ ]+)").expect("valid regex"));

/// Hub device and the description appended to its scene names
struct HarmonyHub {
    name: String,
    description: String,
}

impl From<&DeviceRecord> for HarmonyHub {
    fn from(row: &DeviceRecord) -> Self {
        Self {
            name: row.name.clone(),
            description: row.attribute("EchoDesc").unwrap_or_default().to_string(),
        }
    }
}

/// Discover activities of all harmony hubs
///
/// Failures are logged and yield no scenes.
pub(super) async fn discover_scenes(hub: &dyn HubTransport, catalog: &Catalog) -> Vec<Endpoint> {
    let hubs: Vec<HarmonyHub> = match hub.send(HARMONY_QUERY).await {
        Ok(reply) => reply.into_devices().iter().map(HarmonyHub::from).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "harmony hub query failed");
            return Vec::new();
        }
    };
    if hubs.is_empty() {
        return Vec::new();
    }

    let names: Vec<&str> = hubs.iter().map(|h| h.name.as_str()).collect();
    let command = format!("get {} activities", names.join(","));
    let listing = match hub.send(&command).await {
        Ok(reply) => reply.into_text().unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "harmony activity listing failed");
            return Vec::new();
        }
    };

    parse_activities(catalog, &hubs, &listing)
}

/// Turn an activity listing into scene endpoints
///
/// A `-1` line ends the current hub's block.
fn parse_activities(catalog: &Catalog, hubs: &[HarmonyHub], listing: &str) -> Vec<Endpoint> {
    let Some(scene) = catalog.lookup("scene") else {
        return Vec::new();
    };

    let mut endpoints = Vec::new();
    let mut current = 0;

    for line in listing.lines() {
        let Some(caps) = ACTIVITY_LINE.captures(line) else {
            if !line.trim().is_empty() {
                tracing::warn!(line = %line, "malformed activity line");
            }
            continue;
        };
        let (index, name) = (&caps[1], &caps[2]);

        if index == "-1" {
            current += 1;
            if current >= hubs.len() {
                break;
            }
            continue;
        }

        let Some(owner) = hubs.get(current) else {
            break;
        };

        // the activity id travels in the endpoint id
        let mut cookie = Cookie::new();
        cookie.insert("scene".to_string(), owner.name.clone());

        endpoints.push(Endpoint {
            endpoint_id: scene_endpoint_id(index),
            friendly_name: name.to_string(),
            description: format!("{name} {}", owner.description),
            manufacturer_name: MANUFACTURER.to_string(),
            display_categories: vec![CATEGORY.to_string()],
            cookie,
            capabilities: vec![scene.interface.clone()],
        });
    }

    endpoints
}
