//! Alexa Smart Home API (payload version 3) message types

mod directive;
mod error;
mod response;

pub use directive::{
    Color, Cookie, Directive, DirectiveEnvelope, DirectiveHeader, EndpointRef,
    PlaybackOperation, RawDirective, Temperature,
};
pub use error::{DirectiveError, ErrorType};
pub use response::{
    Context, EndpointEcho, Event, PAYLOAD_VERSION, PropertyReport, Responder, ResponseBuilder,
    ResponseEnvelope, ResponseHeader, UNCERTAINTY_MS,
};
