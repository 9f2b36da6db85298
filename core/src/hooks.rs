//! Construction hooks for the transport.
//!
//! # Design
//! `ConfigHooks` has one method per artifact `HttpRestClient::init` assembles.
//! `create_*` methods produce the starting value and `modify_*` methods receive
//! the value after the transport applied its own settings, so an
//! implementation can replace an artifact wholesale or only tweak the default.
//! Every method has a default body; `DefaultConfigHooks` overrides nothing.
//!
//! Returning `None` from any method makes `init` fail with
//! `ConfigurationError::MissingArtifact` before a request is sent.

use crate::auth::{AuthCache, CredentialStore};
use crate::builder::{ClientBuilder, RequestOptionsBuilder, TlsContextBuilder};
use crate::config::Configuration;
use crate::context::RequestContext;

pub trait ConfigHooks: Send + Sync {
    fn create_tls_context_builder(&self, configuration: &Configuration) -> Option<TlsContextBuilder> {
        Some(TlsContextBuilder::from_configuration(configuration))
    }

    fn create_client_builder(&self, _configuration: &Configuration) -> Option<ClientBuilder> {
        Some(ClientBuilder::new())
    }

    /// Last step before the agent is built.
    fn modify_client_builder(
        &self,
        _configuration: &Configuration,
        builder: ClientBuilder,
    ) -> Option<ClientBuilder> {
        Some(builder)
    }

    fn create_request_options_builder(
        &self,
        _configuration: &Configuration,
    ) -> Option<RequestOptionsBuilder> {
        Some(RequestOptionsBuilder::new())
    }

    /// Runs after the connect timeout and proxy were applied.
    fn modify_request_options(
        &self,
        _configuration: &Configuration,
        builder: RequestOptionsBuilder,
    ) -> Option<RequestOptionsBuilder> {
        Some(builder)
    }

    fn create_credential_store(&self, _configuration: &Configuration) -> Option<CredentialStore> {
        Some(CredentialStore::new())
    }

    /// Runs after proxy and basic-auth credentials were registered.
    fn modify_credential_store(
        &self,
        _configuration: &Configuration,
        store: CredentialStore,
    ) -> Option<CredentialStore> {
        Some(store)
    }

    fn create_auth_cache(&self, _configuration: &Configuration) -> Option<AuthCache> {
        Some(AuthCache::new())
    }

    /// Runs after the proxy and API host scopes were seeded.
    fn modify_auth_cache(&self, _configuration: &Configuration, cache: AuthCache) -> Option<AuthCache> {
        Some(cache)
    }

    /// Called once per request.
    fn create_request_context(&self, _configuration: &Configuration) -> Option<RequestContext> {
        Some(RequestContext::new())
    }

    /// Called once per request, after the shared cache and store were attached.
    fn modify_request_context(
        &self,
        _configuration: &Configuration,
        context: RequestContext,
    ) -> Option<RequestContext> {
        Some(context)
    }
}

/// Hooks that keep every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConfigHooks;

impl ConfigHooks for DefaultConfigHooks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_every_artifact() {
        let hooks = DefaultConfigHooks;
        let config = Configuration::new("http://localhost:8083")
            .unwrap()
            .with_insecure_ssl_certificates();

        let tls = hooks.create_tls_context_builder(&config).unwrap();
        assert_eq!(tls, TlsContextBuilder::new().accept_invalid_certs(true));
        assert!(hooks.create_client_builder(&config).is_some());
        assert!(hooks.create_request_options_builder(&config).is_some());
        assert!(hooks.create_credential_store(&config).unwrap().is_empty());
        assert!(hooks.create_auth_cache(&config).unwrap().is_empty());
        assert!(hooks.create_request_context(&config).is_some());
    }

    #[test]
    fn default_modifiers_pass_values_through() {
        let hooks = DefaultConfigHooks;
        let config = Configuration::new("http://localhost:8083").unwrap();

        let mut store = CredentialStore::new();
        store.set_credentials(
            crate::auth::AuthScope::new("localhost", 8083),
            crate::auth::Credentials::new("u", "p"),
        );
        assert_eq!(
            hooks.modify_credential_store(&config, store.clone()),
            Some(store)
        );

        let options = RequestOptionsBuilder::new().connect_timeout(std::time::Duration::from_secs(1));
        assert_eq!(
            hooks.modify_request_options(&config, options.clone()),
            Some(options)
        );
    }
}
