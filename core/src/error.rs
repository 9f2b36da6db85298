//! Error types for the Kafka Connect transport.
//!
//! # Design
//! Failures are split by when they can happen. `ConfigurationError` is only
//! produced while assembling the transport in `init` and is never worth
//! retrying. `RestError` is produced per request and separates "could not
//! reach or negotiate with the server" (`Connection`) from "the exchange
//! happened but the payload could not be produced or consumed"
//! (`ResultParsing`), so callers can write one retry rule for every verb.
//! HTTP status codes are not errors at this layer; they travel in
//! `RestResponse`.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed source error carried by the request-level variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal problems found while building the transport.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The API host was empty.
    #[error("api host must not be empty")]
    EmptyApiHost,

    /// A construction hook returned `None` instead of an artifact.
    #[error("ConfigHooks::{hook}() must return an instance")]
    MissingArtifact { hook: &'static str },

    /// The API host could not be parsed into a scope for basic auth.
    #[error("invalid api host {host:?}: {source}")]
    InvalidApiHost {
        host: String,
        #[source]
        source: url::ParseError,
    },

    /// The proxy settings did not form a usable proxy URL.
    #[error("invalid proxy {url:?}: {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// A trust store or client identity file could not be read.
    #[error("unable to read {}: {source}", path.display())]
    TlsMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A trust store or client identity file did not hold usable PEM data.
    #[error("invalid PEM data in {}: {reason}", path.display())]
    InvalidPem { path: PathBuf, reason: String },
}

/// Failures surfaced by `RestClient::submit_request`.
#[derive(Debug, Error)]
pub enum RestError {
    /// The server could not be reached or negotiated with: socket, protocol,
    /// URI, TLS or proxy failures. A candidate for retrying.
    #[error("connection failure: {message}")]
    Connection {
        message: String,
        #[source]
        source: BoxError,
    },

    /// The exchange took place but the request body could not be produced or
    /// the response could not be read.
    #[error("result parsing failure: {message}")]
    ResultParsing {
        message: String,
        #[source]
        source: BoxError,
    },

    /// `submit_request` was called before `init` or after `close`.
    #[error("rest client is not initialized")]
    NotInitialized,

    /// A request method name outside GET, POST, PUT and DELETE.
    #[error("unknown request method: {0}")]
    UnknownMethod(String),

    /// A hook misbehaved while building the per-request context.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl RestError {
    pub(crate) fn connection(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        RestError::Connection {
            message: source.to_string(),
            source,
        }
    }

    pub(crate) fn result_parsing(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        RestError::ResultParsing {
            message: source.to_string(),
            source,
        }
    }

    /// True for failures to reach or negotiate with the server.
    pub fn is_connection(&self) -> bool {
        matches!(self, RestError::Connection { .. })
    }

    /// True when the server answered but the payload was unusable.
    pub fn is_result_parsing(&self) -> bool {
        matches!(self, RestError::ResultParsing { .. })
    }
}
