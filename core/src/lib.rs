//! Blocking transport core for the Kafka Connect REST API.
//!
//! # Overview
//! `HttpRestClient` turns `Request` values (an endpoint path, a method and an
//! optional JSON body) into HTTP exchanges against one configured host and
//! hands back a `RestResponse` holding the status code and body text. Request
//! definitions and the typed API built on top live with the caller.
//!
//! # Design
//! - One `ureq::Agent` per `init`/`close` cycle, shared by every request.
//! - Basic-auth and proxy credentials are registered once in `init` and sent
//!   preemptively through a fresh per-request `RequestContext`.
//! - `ConfigHooks` can replace or adjust every artifact `init` assembles.
//! - Failures are classified as `RestError::Connection` or
//!   `RestError::ResultParsing` identically for all four verbs.

pub mod auth;
pub mod builder;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod http;
pub mod request;

pub use auth::{AuthCache, AuthScheme, AuthScope, CredentialStore, Credentials, HttpHost};
pub use builder::{ClientBuilder, RequestOptions, RequestOptionsBuilder, TlsContextBuilder};
pub use client::{HttpRestClient, RestClient};
pub use config::{ClientIdentity, Configuration, Encoding, ProxySettings};
pub use context::RequestContext;
pub use error::{ConfigurationError, RestError};
pub use handler::RestResponseHandler;
pub use hooks::{ConfigHooks, DefaultConfigHooks};
pub use http::{RequestMethod, RestResponse, DEFAULT_HEADERS};
pub use request::Request;
