//! Endpoint discovery
//!
//! Every hub device carrying an `EchoWord` attribute is exposed as (part of)
//! a voice endpoint. Rows sharing a word are merged, so a single endpoint
//! can be backed by several hub devices, one per capability.

#[cfg(feature = "harmony")]
mod harmony;

use serde::{Deserialize, Serialize};

use crate::alexa::{Cookie, DirectiveError};
use crate::capability::{Catalog, DEFAULT_CATEGORY, InterfaceDescriptor};
use crate::hub::{DeviceRecord, HubTransport};

/// Hub query selecting voice-exposed devices and their discovery attributes
pub const DISCOVERY_QUERY: &str = "jsonlist2 EchoWord=..* EchoWord EchoCap EchoDesc EchoCat";

const MANUFACTURER: &str = "FHEM generic";

/// Endpoint id prefix of scene endpoints, followed by the activity id
const SCENE_PREFIX: &str = "hs";

/// Voice-visible logical device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub endpoint_id: String,
    pub friendly_name: String,
    pub description: String,
    pub manufacturer_name: String,
    pub display_categories: Vec<String>,
    pub cookie: Cookie,
    pub capabilities: Vec<InterfaceDescriptor>,
}

/// Endpoint id of the scene starting `activity`
#[must_use]
pub fn scene_endpoint_id(activity: &str) -> String {
    format!("{SCENE_PREFIX}{activity}")
}

/// Activity id carried by a scene endpoint id
#[must_use]
pub fn scene_activity(endpoint_id: &str) -> Option<&str> {
    endpoint_id
        .strip_prefix(SCENE_PREFIX)
        .filter(|id| !id.is_empty())
}

/// Endpoint id for a friendly name
///
/// Every character outside `[a-zA-Z0-9]` becomes `_`.
#[must_use]
pub fn endpoint_id(friendly_name: &str) -> String {
    friendly_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Endpoint under construction
struct Draft {
    endpoint: Endpoint,
    capability_keys: Vec<String>,
    explicit_category: Option<String>,
    implied_category: Option<&'static str>,
}

impl Draft {
    fn new(friendly_name: &str, description: Option<&str>) -> Self {
        Self {
            endpoint: Endpoint {
                endpoint_id: endpoint_id(friendly_name),
                friendly_name: friendly_name.to_string(),
                description: description.unwrap_or(friendly_name).to_string(),
                manufacturer_name: MANUFACTURER.to_string(),
                display_categories: Vec::new(),
                cookie: Cookie::new(),
                capabilities: Vec::new(),
            },
            capability_keys: Vec::new(),
            explicit_category: None,
            implied_category: None,
        }
    }

    fn add_row(&mut self, catalog: &Catalog, row: &DeviceRecord) {
        if self.explicit_category.is_none() {
            self.explicit_category = row.attribute("EchoCat").map(str::to_string);
        }

        let Some(caps) = row.attribute("EchoCap") else {
            return;
        };

        for token in caps.split_whitespace() {
            let (key, device) = match token.split_once(':') {
                Some((key, device)) if !key.is_empty() && !device.is_empty() => (key, device),
                _ => (token, row.name.as_str()),
            };

            let Some(spec) = catalog.lookup(key) else {
                tracing::warn!(
                    endpoint = %self.endpoint.friendly_name,
                    capability = %key,
                    "unsupported capability, skipping"
                );
                continue;
            };

            self.endpoint
                .cookie
                .insert(key.to_string(), device.to_string());

            if !self.capability_keys.iter().any(|k| k == key) {
                self.capability_keys.push(key.to_string());
                self.endpoint.capabilities.push(spec.interface.clone());
            }

            if self.implied_category.is_none() {
                self.implied_category = spec.category;
            }
        }
    }

    fn finish(mut self) -> Endpoint {
        let category = self
            .explicit_category
            .or_else(|| self.implied_category.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        self.endpoint.display_categories = vec![category];
        self.endpoint
    }
}

/// Merge `jsonlist2` rows into endpoints, keeping first-appearance order
#[must_use]
pub fn build_endpoints(catalog: &Catalog, rows: &[DeviceRecord]) -> Vec<Endpoint> {
    let mut drafts: Vec<Draft> = Vec::new();

    for row in rows {
        let Some(word) = row.attribute("EchoWord") else {
            tracing::debug!(device = %row.name, "row without EchoWord, skipping");
            continue;
        };

        let index = match drafts
            .iter()
            .position(|d| d.endpoint.friendly_name == word)
        {
            Some(index) => index,
            None => {
                drafts.push(Draft::new(word, row.attribute("EchoDesc")));
                drafts.len() - 1
            }
        };
        drafts[index].add_row(catalog, row);
    }

    drafts.into_iter().map(Draft::finish).collect()
}

/// Discover every voice-exposed endpoint
///
/// # Errors
///
/// Returns `BridgeUnreachable` if the hub returns neither device rows nor
/// scenes, or the mapped transport error
pub async fn discover(
    hub: &dyn HubTransport,
    catalog: &Catalog,
) -> Result<Vec<Endpoint>, DirectiveError> {
    let rows = hub.send(DISCOVERY_QUERY).await?.into_devices();

    #[cfg(feature = "harmony")]
    let scenes = harmony::discover_scenes(hub, catalog).await;
    #[cfg(not(feature = "harmony"))]
    let scenes = Vec::new();

    if rows.is_empty() && scenes.is_empty() {
        return Err(DirectiveError::BridgeUnreachable(
            "no answer from hub".to_string(),
        ));
    }

    let mut endpoints = build_endpoints(catalog, &rows);
    endpoints.extend(scenes);

    tracing::info!(count = endpoints.len(), "discovery finished");
    Ok(endpoints)
}
