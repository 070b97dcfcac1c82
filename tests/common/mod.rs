//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use alexa_fhem_gateway::hub::{HubReply, JsonList};
use alexa_fhem_gateway::{Catalog, DirectiveEnvelope, Dispatcher, HubTransport, Result};

/// Recording fake hub
///
/// Replies are matched by command prefix in registration order; unmatched
/// commands get an empty reply.
#[derive(Default)]
pub struct MockHub {
    replies: Mutex<Vec<(String, HubReply)>>,
    sent: Mutex<Vec<String>>,
}

impl MockHub {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer commands starting with `prefix` with a `jsonlist2` document
    pub fn reply_json(&self, prefix: &str, results: Value) {
        let list: JsonList =
            serde_json::from_value(json!({ "Results": results })).expect("valid jsonlist2");
        self.reply(prefix, HubReply::Devices(list));
    }

    /// Answer commands starting with `prefix` with text
    pub fn reply_text(&self, prefix: &str, text: &str) {
        self.reply(prefix, HubReply::Text(text.to_string()));
    }

    pub fn reply(&self, prefix: &str, reply: HubReply) {
        self.replies
            .lock()
            .unwrap()
            .push((prefix.to_string(), reply));
    }

    /// Commands received so far
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl HubTransport for MockHub {
    async fn send(&self, command: &str) -> Result<HubReply> {
        self.sent.lock().unwrap().push(command.to_string());
        let replies = self.replies.lock().unwrap();
        Ok(replies
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map_or(HubReply::Empty, |(_, reply)| reply.clone()))
    }
}

/// Dispatcher over a fake hub with the standard catalog
#[must_use]
pub fn dispatcher(hub: &Arc<MockHub>) -> Arc<Dispatcher> {
    let hub: Arc<dyn HubTransport> = hub.clone();
    Arc::new(Dispatcher::new(hub, Arc::new(Catalog::standard())))
}

/// Directive envelope for an endpoint with the given cookie
#[must_use]
pub fn directive(namespace: &str, name: &str, cookie: Value, payload: Value) -> DirectiveEnvelope {
    serde_json::from_value(json!({
        "directive": {
            "header": {
                "namespace": namespace,
                "name": name,
                "payloadVersion": "3",
                "messageId": "msg-1",
                "correlationToken": "corr-1"
            },
            "endpoint": {
                "scope": { "type": "BearerToken", "token": "token" },
                "endpointId": "Stehlampe",
                "cookie": cookie
            },
            "payload": payload
        }
    }))
    .expect("valid directive")
}

/// Directive envelope without an endpoint
#[must_use]
pub fn bare_directive(namespace: &str, name: &str, payload: Value) -> DirectiveEnvelope {
    serde_json::from_value(json!({
        "directive": {
            "header": {
                "namespace": namespace,
                "name": name,
                "payloadVersion": "3",
                "messageId": "msg-1"
            },
            "payload": payload
        }
    }))
    .expect("valid directive")
}

/// A `jsonlist2` row for a dimmable lamp
#[must_use]
pub fn lamp_row(name: &str, state: &str, brightness: &str) -> Value {
    json!({
        "Name": name,
        "Internals": { "STATE": state },
        "Readings": {
            "brightness": { "Value": brightness, "Time": "2024-03-01 18:30:00" }
        },
        "Attributes": {}
    })
}
