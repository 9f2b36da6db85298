//! The transport: builds the shared `ureq::Agent` and dispatches requests.
//!
//! # Design
//! `HttpRestClient` owns one agent between `init` and `close`, together with
//! the credential store and auth cache filled during `init`. `init` and
//! `close` take `&mut self` while `submit_request` takes `&self`, so requests
//! can run concurrently from many threads but never overlap with the
//! transport being rebuilt or torn down.
//!
//! Every verb goes through the same classification: failures to reach or
//! negotiate with the server become `RestError::Connection`, anything else
//! (body serialization, unreadable responses) becomes
//! `RestError::ResultParsing`. Nothing is retried here.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace, warn};
use ureq::http::Response;
use ureq::typestate::WithBody;
use ureq::{Agent, Body, RequestBuilder};

use crate::auth::{AuthCache, AuthScheme, AuthScope, CredentialStore, HttpHost};
use crate::config::{Configuration, Encoding};
use crate::context::RequestContext;
use crate::error::{ConfigurationError, RestError};
use crate::handler::RestResponseHandler;
use crate::hooks::{ConfigHooks, DefaultConfigHooks};
use crate::http::{RequestMethod, RestResponse, DEFAULT_HEADERS};
use crate::request::Request;

/// Lifecycle shared by transports.
pub trait RestClient {
    /// Build the underlying client from `configuration`. Replaces any
    /// previously initialized client.
    fn init(&mut self, configuration: Configuration) -> Result<(), ConfigurationError>;

    /// Send `request` and return the raw status and body.
    fn submit_request<R: Request>(&self, request: &R) -> Result<RestResponse, RestError>;

    /// Release the underlying client. Safe to call more than once.
    fn close(&mut self);
}

struct Transport {
    configuration: Configuration,
    agent: Agent,
    auth_cache: Arc<AuthCache>,
    credentials: Arc<CredentialStore>,
}

/// `RestClient` backed by a blocking `ureq` agent.
pub struct HttpRestClient<H: ConfigHooks = DefaultConfigHooks> {
    hooks: H,
    transport: Option<Transport>,
}

impl HttpRestClient<DefaultConfigHooks> {
    pub fn new() -> Self {
        Self::with_hooks(DefaultConfigHooks)
    }
}

impl Default for HttpRestClient<DefaultConfigHooks> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ConfigHooks> HttpRestClient<H> {
    /// Use `hooks` to create and adjust the artifacts `init` assembles.
    pub fn with_hooks(hooks: H) -> Self {
        Self {
            hooks,
            transport: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.transport.is_some()
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.transport.as_ref().map(|t| &t.configuration)
    }

    /// Auth cache in use since the last `init`.
    pub fn auth_cache(&self) -> Option<&AuthCache> {
        self.transport.as_ref().map(|t| t.auth_cache.as_ref())
    }

    /// Credential store in use since the last `init`.
    pub fn credential_store(&self) -> Option<&CredentialStore> {
        self.transport.as_ref().map(|t| t.credentials.as_ref())
    }

    fn build_transport(&self, configuration: Configuration) -> Result<Transport, ConfigurationError> {
        let hooks = &self.hooks;

        let tls_config = require(
            hooks.create_tls_context_builder(&configuration),
            "create_tls_context_builder",
        )?
        .build()?;

        let client_builder = require(
            hooks.create_client_builder(&configuration),
            "create_client_builder",
        )?
        .connection_time_to_live(Duration::from_secs(
            configuration.connection_time_to_live_in_seconds(),
        ))
        .tls_config(tls_config);

        let mut options_builder = require(
            hooks.create_request_options_builder(&configuration),
            "create_request_options_builder",
        )?
        .connect_timeout(Duration::from_millis(
            configuration.request_timeout_in_seconds().saturating_mul(1_000),
        ));

        let mut credentials = require(
            hooks.create_credential_store(&configuration),
            "create_credential_store",
        )?;
        let mut auth_cache = require(hooks.create_auth_cache(&configuration), "create_auth_cache")?;

        if let Some(proxy) = configuration.proxy() {
            let proxy_host = HttpHost::new(&proxy.host, proxy.port, &proxy.scheme);
            if let Some(proxy_credentials) = &proxy.credentials {
                credentials.set_credentials(AuthScope::from(&proxy_host), proxy_credentials.clone());
                auth_cache.put(proxy_host.clone(), AuthScheme::Basic);
            }
            options_builder = options_builder.proxy(proxy_host);
        }

        if let Some(basic_auth) = configuration.basic_auth() {
            let api_host = HttpHost::from_url(configuration.api_host()).map_err(|source| {
                ConfigurationError::InvalidApiHost {
                    host: configuration.api_host().to_string(),
                    source,
                }
            })?;
            credentials.set_credentials(AuthScope::from(&api_host), basic_auth.clone());
            auth_cache.put(api_host, AuthScheme::Basic);
        }

        let auth_cache = require(
            hooks.modify_auth_cache(&configuration, auth_cache),
            "modify_auth_cache",
        )?;
        let credentials = require(
            hooks.modify_credential_store(&configuration, credentials),
            "modify_credential_store",
        )?;
        let options_builder = require(
            hooks.modify_request_options(&configuration, options_builder),
            "modify_request_options",
        )?;

        let client_builder = client_builder
            .default_credentials(credentials.clone())
            .default_request_options(options_builder.build());
        let client_builder = require(
            hooks.modify_client_builder(&configuration, client_builder),
            "modify_client_builder",
        )?;
        let agent = client_builder.build()?;

        let transport = Transport {
            configuration,
            agent,
            auth_cache: Arc::new(auth_cache),
            credentials: Arc::new(credentials),
        };
        // Context hooks otherwise only run per request.
        self.create_request_context(&transport)?;
        Ok(transport)
    }

    fn create_request_context(&self, transport: &Transport) -> Result<RequestContext, ConfigurationError> {
        let mut context = require(
            self.hooks.create_request_context(&transport.configuration),
            "create_request_context",
        )?;
        context.set_auth_cache(Arc::clone(&transport.auth_cache));
        context.set_credentials(Arc::clone(&transport.credentials));
        require(
            self.hooks
                .modify_request_context(&transport.configuration, context),
            "modify_request_context",
        )
    }

    /// Attach the default headers, the preemptive `Authorization` header and
    /// any context headers.
    fn prepare<B>(
        &self,
        transport: &Transport,
        request: RequestBuilder<B>,
        url: &str,
    ) -> Result<RequestBuilder<B>, RestError> {
        let target = HttpHost::from_url(url).map_err(RestError::connection)?;
        let context = self.create_request_context(transport)?;

        let mut request = DEFAULT_HEADERS
            .iter()
            .fold(request, |request, (name, value)| request.header(*name, *value));
        if let Some(authorization) = context.authorization_for(&target) {
            request = request.header("Authorization", authorization);
        }
        for (name, value) in context.headers() {
            request = request.header(name.as_str(), value.as_str());
        }
        Ok(request)
    }

    fn submit_get_request(
        &self,
        transport: &Transport,
        url: &str,
        params: &[(String, String)],
    ) -> Result<RestResponse, RestError> {
        let mut request = transport.agent.get(url);
        for (key, value) in params {
            request = request.query(key.as_str(), value.as_str());
        }
        let request = self.prepare(transport, request, url)?;
        debug!("executing request GET {url}");
        execute(request.call())
    }

    fn submit_post_request<B: Serialize>(
        &self,
        transport: &Transport,
        url: &str,
        body: Option<&B>,
    ) -> Result<RestResponse, RestError> {
        let payload = encode_body(body, transport.configuration.encoding())?;
        let request = self.prepare(transport, transport.agent.post(url), url)?;
        send(request, RequestMethod::Post, url, payload)
    }

    fn submit_put_request<B: Serialize>(
        &self,
        transport: &Transport,
        url: &str,
        body: Option<&B>,
    ) -> Result<RestResponse, RestError> {
        let payload = encode_body(body, transport.configuration.encoding())?;
        let request = self.prepare(transport, transport.agent.put(url), url)?;
        send(request, RequestMethod::Put, url, payload)
    }

    /// DELETE may carry a body; Kafka Connect ignores it, other servers may not.
    fn submit_delete_request<B: Serialize>(
        &self,
        transport: &Transport,
        url: &str,
        body: Option<&B>,
    ) -> Result<RestResponse, RestError> {
        let payload = encode_body(body, transport.configuration.encoding())?;
        let request = transport.agent.delete(url).force_send_body();
        let request = self.prepare(transport, request, url)?;
        send(request, RequestMethod::Delete, url, payload)
    }
}

impl<H: ConfigHooks> RestClient for HttpRestClient<H> {
    fn init(&mut self, configuration: Configuration) -> Result<(), ConfigurationError> {
        let transport = self.build_transport(configuration)?;
        debug!(
            api_host = transport.configuration.api_host(),
            "rest client initialized"
        );
        self.transport = Some(transport);
        Ok(())
    }

    fn submit_request<R: Request>(&self, request: &R) -> Result<RestResponse, RestError> {
        let Some(transport) = self.transport.as_ref() else {
            warn!("request submitted to a rest client that is not initialized");
            return Err(RestError::NotInitialized);
        };
        let url = format!(
            "{}{}",
            transport.configuration.api_host(),
            request.api_endpoint()
        );

        match request.request_method() {
            RequestMethod::Get => self.submit_get_request(transport, &url, &[]),
            RequestMethod::Post => self.submit_post_request(transport, &url, request.request_body()),
            RequestMethod::Put => self.submit_put_request(transport, &url, request.request_body()),
            RequestMethod::Delete => {
                self.submit_delete_request(transport, &url, request.request_body())
            }
        }
    }

    fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            debug!(
                api_host = transport.configuration.api_host(),
                "closing rest client"
            );
        }
    }
}

fn require<T>(value: Option<T>, hook: &'static str) -> Result<T, ConfigurationError> {
    value.ok_or(ConfigurationError::MissingArtifact { hook })
}

fn encode_body<B: Serialize>(
    body: Option<&B>,
    encoding: Encoding,
) -> Result<Option<Vec<u8>>, RestError> {
    body.map(|body| {
        serde_json::to_string(body)
            .map(|json| encoding.encode_json(&json))
            .map_err(RestError::result_parsing)
    })
    .transpose()
}

fn send(
    request: RequestBuilder<WithBody>,
    method: RequestMethod,
    url: &str,
    payload: Option<Vec<u8>>,
) -> Result<RestResponse, RestError> {
    match payload {
        Some(payload) => {
            debug!("executing request {method} {url} with {} byte body", payload.len());
            trace!(body = %String::from_utf8_lossy(&payload), "request payload");
            execute(request.send(&payload[..]))
        }
        None => {
            debug!("executing request {method} {url}");
            execute(request.send_empty())
        }
    }
}

fn execute(result: Result<Response<Body>, ureq::Error>) -> Result<RestResponse, RestError> {
    let response = result.map_err(classify)?;
    RestResponseHandler.handle_response(response)
}

fn classify(error: ureq::Error) -> RestError {
    if is_connection_failure(&error) {
        RestError::connection(error)
    } else {
        RestError::result_parsing(error)
    }
}

fn is_connection_failure(error: &ureq::Error) -> bool {
    match error {
        ureq::Error::Io(io) => is_socket_error(io.kind()),
        ureq::Error::Http(_)
        | ureq::Error::BadUri(_)
        | ureq::Error::Protocol(_)
        | ureq::Error::Timeout(_)
        | ureq::Error::HostNotFound
        | ureq::Error::ConnectionFailed
        | ureq::Error::RedirectFailed
        | ureq::Error::TooManyRedirects
        | ureq::Error::InvalidProxyUrl
        | ureq::Error::ConnectProxyFailed(_)
        | ureq::Error::Tls(_)
        | ureq::Error::Rustls(_) => true,
        _ => false,
    }
}

fn is_socket_error(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrInUse
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::TimedOut
    )
}
