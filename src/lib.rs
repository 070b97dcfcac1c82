//! FHEM gateway for the Alexa Smart Home API
//!
//! Receives Smart Home directives (payload version 3), translates them into
//! FHEM command strings, sends them to the hub's HTTP command API and maps
//! the hub's reply back into directive responses.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          POST /alexa  │  alexa-fhem invoke           │
//! └────────────────────┬────────────────────────────────┘
//!                      │ DirectiveEnvelope
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Dispatcher                          │
//! │   Discovery  │  State Reporter  │  Capability Catalog│
//! └────────────────────┬────────────────────────────────┘
//!                      │ command string
//! ┌────────────────────▼────────────────────────────────┐
//! │            FHEM (HTTP command API)                   │
//! │   set  │  jsonlist2  │  get                          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod alexa;
pub mod api;
pub mod capability;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod state;

pub use alexa::{
    Directive, DirectiveEnvelope, DirectiveError, ErrorType, PropertyReport, Responder,
    ResponseBuilder, ResponseEnvelope,
};
pub use api::ApiServer;
pub use capability::Catalog;
pub use config::Config;
pub use discovery::{Endpoint, discover};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use hub::{DeviceRecord, FhemClient, HubReply, HubTransport};
pub use state::{Patch, StateReporter};
