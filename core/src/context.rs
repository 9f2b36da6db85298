//! Per-request execution context.
//!
//! A fresh `RequestContext` is built for every request. It wraps the auth
//! cache and credential store filled during `init`, shared through `Arc`, so
//! concurrent requests each get their own context while reading the same
//! negotiated credentials.

use std::sync::Arc;

use crate::auth::{AuthCache, AuthScheme, AuthScope, CredentialStore, HttpHost};

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    auth_cache: Arc<AuthCache>,
    credentials: Arc<CredentialStore>,
    headers: Vec<(String, String)>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_auth_cache(&mut self, auth_cache: Arc<AuthCache>) {
        self.auth_cache = auth_cache;
    }

    pub fn set_credentials(&mut self, credentials: Arc<CredentialStore>) {
        self.credentials = credentials;
    }

    /// Extra header sent after the default headers.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn auth_cache(&self) -> &AuthCache {
        &self.auth_cache
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Preemptive `Authorization` value for `target`, if the cache marks it
    /// as negotiated and the store holds credentials for its scope.
    pub fn authorization_for(&self, target: &HttpHost) -> Option<String> {
        match self.auth_cache.get(target)? {
            AuthScheme::Basic => self
                .credentials
                .credentials(&AuthScope::from(target))
                .map(|c| c.basic_header_value()),
        }
    }
}
