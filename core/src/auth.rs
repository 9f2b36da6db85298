//! Credentials, scopes and the preemptive auth cache.
//!
//! # Design
//! A `CredentialStore` maps an `AuthScope` (host and port) to the username and
//! password to use there. An `AuthCache` marks an `HttpHost` (host, port and
//! scheme) as already negotiated, which is what makes authentication
//! preemptive: a request to a cached host carries its credentials on the first
//! attempt instead of waiting for a challenge. Both are filled during
//! `RestClient::init` and only read afterwards. Hosts are stored lowercase so
//! lookups are case-insensitive.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use url::Url;

/// Where an `Authorization` header should be sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthScope {
    host: String,
    port: u16,
}

impl AuthScope {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_ascii_lowercase(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl From<&HttpHost> for AuthScope {
    fn from(host: &HttpHost) -> Self {
        Self {
            host: host.host.clone(),
            port: host.port,
        }
    }
}

impl fmt::Display for AuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A host together with the port and scheme used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpHost {
    host: String,
    port: u16,
    scheme: String,
}

impl HttpHost {
    pub fn new(host: &str, port: u16, scheme: &str) -> Self {
        Self {
            host: host.to_ascii_lowercase(),
            port,
            scheme: scheme.to_ascii_lowercase(),
        }
    }

    /// Parse the host part of an absolute URL. A missing port falls back to
    /// the scheme's well-known port.
    pub fn from_url(url: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(url)?;
        let host = parsed.host_str().ok_or(url::ParseError::EmptyHost)?;
        let port = parsed
            .port_or_known_default()
            .ok_or(url::ParseError::InvalidPort)?;
        Ok(Self::new(host, port, parsed.scheme()))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn to_uri(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl fmt::Display for HttpHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

/// Username and password pair. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Value for an `Authorization: Basic` header.
    pub fn basic_header_value(&self) -> String {
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Credentials keyed by scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialStore {
    entries: HashMap<AuthScope, Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_credentials(&mut self, scope: AuthScope, credentials: Credentials) {
        self.entries.insert(scope, credentials);
    }

    pub fn credentials(&self, scope: &AuthScope) -> Option<&Credentials> {
        self.entries.get(scope)
    }

    pub fn remove(&mut self, scope: &AuthScope) -> Option<Credentials> {
        self.entries.remove(scope)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Authentication scheme remembered by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
}

/// Hosts for which credentials are sent without waiting for a challenge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthCache {
    entries: HashMap<HttpHost, AuthScheme>,
}

impl AuthCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, host: HttpHost, scheme: AuthScheme) {
        self.entries.insert(host, scheme);
    }

    pub fn get(&self, host: &HttpHost) -> Option<AuthScheme> {
        self.entries.get(host).copied()
    }

    pub fn remove(&mut self, host: &HttpHost) -> Option<AuthScheme> {
        self.entries.remove(host)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
