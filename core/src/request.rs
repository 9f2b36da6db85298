//! The contract implemented by individual Kafka Connect request definitions.
//!
//! A request knows its endpoint path (already escaped and starting with `/`),
//! its method and an optional JSON body. The transport never looks inside the
//! body or the response; `parse_response` is for the caller once a
//! `RestResponse` comes back.

use serde::Serialize;

use crate::http::RequestMethod;

pub trait Request {
    /// JSON body type. Requests without a body can use `()`.
    type Body: Serialize;
    /// Parsed result type.
    type Response;

    fn api_endpoint(&self) -> String;

    fn request_method(&self) -> RequestMethod;

    fn request_body(&self) -> Option<&Self::Body> {
        None
    }

    fn parse_response(&self, body: &str) -> serde_json::Result<Self::Response>;
}
