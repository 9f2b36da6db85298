//! Transport configuration.
//!
//! # Design
//! `Configuration` is plain data with consuming `with_*` setters. It is built
//! once by the caller and handed to `RestClient::init`, after which the
//! transport owns it until `close`. The API host is normalized at construction
//! (scheme added when missing, trailing slashes removed) so endpoint paths,
//! which always start with `/`, can be appended verbatim.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use encoding_rs::EncoderResult;

use crate::auth::Credentials;
use crate::error::ConfigurationError;

/// Environment variable consulted by `Configuration::from_env`.
pub const HOST_ENV_VAR: &str = "KAFKA_CONNECT_HOST";

const DEFAULT_HOST: &str = "localhost:8083";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
const DEFAULT_CONNECTION_TTL_SECS: u64 = 300;

/// Character set used to encode request payloads.
///
/// Any WHATWG label `encoding_rs` knows is accepted. Labels for UTF-16 and
/// the replacement encoding resolve to UTF-8, as `encoding_rs` never encodes
/// into them. `US-ASCII` is kept strictly 7-bit instead of following the
/// WHATWG alias to windows-1252.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    charset: &'static encoding_rs::Encoding,
    ascii_only: bool,
}

impl Encoding {
    pub fn utf8() -> Self {
        Self::from_charset(encoding_rs::UTF_8)
    }

    /// ISO-8859-1, encoded as its windows-1252 superset.
    pub fn iso_8859_1() -> Self {
        Self::from_charset(encoding_rs::WINDOWS_1252)
    }

    pub fn us_ascii() -> Self {
        Self {
            charset: encoding_rs::WINDOWS_1252,
            ascii_only: true,
        }
    }

    /// Resolve a charset label such as `utf-8`, `latin1` or `windows-1250`.
    pub fn for_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if ["us-ascii", "us_ascii", "ascii"]
            .iter()
            .any(|ascii| label.eq_ignore_ascii_case(ascii))
        {
            return Some(Self::us_ascii());
        }
        encoding_rs::Encoding::for_label(label.as_bytes()).map(Self::from_charset)
    }

    fn from_charset(charset: &'static encoding_rs::Encoding) -> Self {
        Self {
            charset: charset.output_encoding(),
            ascii_only: false,
        }
    }

    /// Canonical charset name.
    pub fn name(self) -> &'static str {
        if self.ascii_only {
            "US-ASCII"
        } else {
            self.charset.name()
        }
    }

    /// Encode serialized JSON text.
    ///
    /// Characters the charset cannot represent only ever appear inside JSON
    /// strings, so they are written as `\uXXXX` escapes (a surrogate pair above
    /// U+FFFF) and the payload stays lossless.
    pub fn encode_json(self, json: &str) -> Vec<u8> {
        if self.ascii_only {
            let mut out = Vec::with_capacity(json.len());
            for ch in json.chars() {
                if ch.is_ascii() {
                    out.push(ch as u8);
                } else {
                    push_escaped(ch, &mut out);
                }
            }
            return out;
        }
        if self.charset == encoding_rs::UTF_8 {
            return json.as_bytes().to_vec();
        }

        let mut encoder = self.charset.new_encoder();
        let mut out = Vec::new();
        let mut input = json;
        loop {
            let needed = encoder
                .max_buffer_length_from_utf8_without_replacement(input.len())
                .unwrap_or(input.len());
            out.reserve(needed);
            let (result, read) =
                encoder.encode_from_utf8_to_vec_without_replacement(input, &mut out, true);
            input = &input[read..];
            match result {
                EncoderResult::InputEmpty => return out,
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(ch) => push_escaped(ch, &mut out),
            }
        }
    }
}

fn push_escaped(ch: char, out: &mut Vec<u8>) {
    let mut units = [0u16; 2];
    for unit in ch.encode_utf16(&mut units) {
        out.extend_from_slice(format!("\\u{unit:04x}").as_bytes());
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a charset label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported encoding: {0}")]
pub struct UnsupportedEncoding(pub String);

impl FromStr for Encoding {
    type Err = UnsupportedEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::for_label(s).ok_or_else(|| UnsupportedEncoding(s.to_string()))
    }
}

/// Forward proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    /// Lowercase scheme understood by the engine: `http`, `https`, `socks4`,
    /// `socks4a` or `socks5`.
    pub scheme: String,
    pub credentials: Option<Credentials>,
}

/// Client certificate material for mutual TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// PEM file holding the certificate chain.
    pub certificate_chain: PathBuf,
    /// PEM file holding the private key. May be the same file as the chain.
    pub private_key: PathBuf,
}

/// Settings for one `init`/`close` cycle of a `RestClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    api_host: String,
    request_timeout_secs: u64,
    connection_ttl_secs: u64,
    encoding: Encoding,
    proxy: Option<ProxySettings>,
    basic_auth: Option<Credentials>,
    ignore_invalid_ssl_certificates: bool,
    trust_store: Option<PathBuf>,
    client_identity: Option<ClientIdentity>,
}

impl Configuration {
    /// Create a configuration for `api_host`, e.g. `http://localhost:8083` or
    /// `localhost:8083`.
    pub fn new(api_host: &str) -> Result<Self, ConfigurationError> {
        let trimmed = api_host.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigurationError::EmptyApiHost);
        }
        let api_host = match ["http://", "https://"].into_iter().find(|scheme| {
            trimmed
                .get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        }) {
            Some(scheme) => format!("{scheme}{}", &trimmed[scheme.len()..]),
            None => format!("http://{trimmed}"),
        };
        Ok(Self {
            api_host,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connection_ttl_secs: DEFAULT_CONNECTION_TTL_SECS,
            encoding: Encoding::default(),
            proxy: None,
            basic_auth: None,
            ignore_invalid_ssl_certificates: false,
            trust_store: None,
            client_identity: None,
        })
    }

    /// Build from `KAFKA_CONNECT_HOST`, falling back to `localhost:8083`.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let host = std::env::var(HOST_ENV_VAR)
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        Self::new(&host)
    }

    /// Route requests through an HTTP proxy.
    pub fn with_proxy(mut self, host: &str, port: u16) -> Self {
        let credentials = self.proxy.take().and_then(|p| p.credentials);
        self.proxy = Some(ProxySettings {
            host: host.to_string(),
            port,
            scheme: "http".to_string(),
            credentials,
        });
        self
    }

    /// Change the proxy scheme. No effect without `with_proxy`.
    pub fn with_proxy_scheme(mut self, scheme: &str) -> Self {
        if let Some(proxy) = self.proxy.as_mut() {
            proxy.scheme = scheme.to_ascii_lowercase();
        }
        self
    }

    /// Authenticate against the proxy. No effect without `with_proxy`.
    pub fn with_proxy_authentication(mut self, username: &str, password: &str) -> Self {
        if let Some(proxy) = self.proxy.as_mut() {
            proxy.credentials = Some(Credentials::new(username, password));
        }
        self
    }

    /// Send HTTP basic credentials to the API host.
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic_auth = Some(Credentials::new(username, password));
        self
    }

    /// Skip server certificate verification. Only for test clusters.
    pub fn with_insecure_ssl_certificates(mut self) -> Self {
        self.ignore_invalid_ssl_certificates = true;
        self
    }

    /// Trust only the root certificates found in a PEM bundle.
    pub fn with_trust_store(mut self, path: impl AsRef<Path>) -> Self {
        self.trust_store = Some(path.as_ref().to_path_buf());
        self
    }

    /// Present a client certificate. Both paths may point at the same PEM file.
    pub fn with_client_identity(
        mut self,
        certificate_chain: impl AsRef<Path>,
        private_key: impl AsRef<Path>,
    ) -> Self {
        self.client_identity = Some(ClientIdentity {
            certificate_chain: certificate_chain.as_ref().to_path_buf(),
            private_key: private_key.as_ref().to_path_buf(),
        });
        self
    }

    /// Connect timeout, in seconds.
    pub fn with_request_timeout_in_seconds(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// How long pooled connections may be kept, in seconds.
    pub fn with_connection_time_to_live_in_seconds(mut self, seconds: u64) -> Self {
        self.connection_ttl_secs = seconds;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    pub fn request_timeout_in_seconds(&self) -> u64 {
        self.request_timeout_secs
    }

    pub fn connection_time_to_live_in_seconds(&self) -> u64 {
        self.connection_ttl_secs
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn proxy(&self) -> Option<&ProxySettings> {
        self.proxy.as_ref()
    }

    pub fn basic_auth(&self) -> Option<&Credentials> {
        self.basic_auth.as_ref()
    }

    pub fn ignore_invalid_ssl_certificates(&self) -> bool {
        self.ignore_invalid_ssl_certificates
    }

    pub fn trust_store(&self) -> Option<&Path> {
        self.trust_store.as_deref()
    }

    pub fn client_identity(&self) -> Option<&ClientIdentity> {
        self.client_identity.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_without_scheme_gets_http() {
        let config = Configuration::new("localhost:8083").unwrap();
        assert_eq!(config.api_host(), "http://localhost:8083");
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let config = Configuration::new("https://connect.internal:8443//").unwrap();
        assert_eq!(config.api_host(), "https://connect.internal:8443");
    }

    #[test]
    fn scheme_is_matched_case_insensitively() {
        let config = Configuration::new("HTTPS://connect.example.com:8443").unwrap();
        assert_eq!(config.api_host(), "https://connect.example.com:8443");
        let config = Configuration::new("Http://Connect.example.com").unwrap();
        assert_eq!(config.api_host(), "http://Connect.example.com");
    }

    #[test]
    fn empty_host_is_rejected() {
        assert!(matches!(
            Configuration::new("  /"),
            Err(ConfigurationError::EmptyApiHost)
        ));
    }

    #[test]
    fn defaults() {
        let config = Configuration::new("http://localhost:8083").unwrap();
        assert_eq!(config.request_timeout_in_seconds(), 300);
        assert_eq!(config.connection_time_to_live_in_seconds(), 300);
        assert_eq!(config.encoding(), Encoding::utf8());
        assert!(config.proxy().is_none());
        assert!(config.basic_auth().is_none());
        assert!(!config.ignore_invalid_ssl_certificates());
    }

    #[test]
    fn proxy_settings_compose_in_any_order() {
        let config = Configuration::new("http://localhost:8083")
            .unwrap()
            .with_proxy("proxy.local", 3128)
            .with_proxy_authentication("pu", "pp")
            .with_proxy_scheme("HTTPS");
        let proxy = config.proxy().unwrap();
        assert_eq!(proxy.host, "proxy.local");
        assert_eq!(proxy.port, 3128);
        assert_eq!(proxy.scheme, "https");
        assert_eq!(proxy.credentials, Some(Credentials::new("pu", "pp")));

        let moved = config.with_proxy("other.local", 8080);
        assert_eq!(
            moved.proxy().unwrap().credentials,
            Some(Credentials::new("pu", "pp"))
        );
    }

    #[test]
    fn proxy_authentication_needs_proxy() {
        let config = Configuration::new("http://localhost:8083")
            .unwrap()
            .with_proxy_authentication("pu", "pp");
        assert!(config.proxy().is_none());
    }

    #[test]
    fn debug_hides_passwords() {
        let config = Configuration::new("http://localhost:8083")
            .unwrap()
            .with_basic_auth("admin", "hunter2")
            .with_proxy("proxy.local", 3128)
            .with_proxy_authentication("pu", "s3cret");
        let debug = format!("{config:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn encoding_names_parse() {
        assert_eq!("utf8".parse::<Encoding>().unwrap(), Encoding::utf8());
        assert_eq!("ISO-8859-1".parse::<Encoding>().unwrap(), Encoding::iso_8859_1());
        assert_eq!("Latin1".parse::<Encoding>().unwrap(), Encoding::iso_8859_1());
        assert_eq!("US-ASCII".parse::<Encoding>().unwrap(), Encoding::us_ascii());
        assert_eq!(" ascii ".parse::<Encoding>().unwrap(), Encoding::us_ascii());
        assert_eq!("utf-16le".parse::<Encoding>().unwrap(), Encoding::utf8());
        assert!("EBCDIC".parse::<Encoding>().is_err());
    }

    #[test]
    fn names_are_canonical() {
        assert_eq!(Encoding::utf8().to_string(), "UTF-8");
        assert_eq!(Encoding::us_ascii().to_string(), "US-ASCII");
        assert_eq!(Encoding::for_label("ISO-8859-15").unwrap().name(), "ISO-8859-15");
    }

    #[test]
    fn latin1_keeps_representable_characters() {
        let bytes = Encoding::iso_8859_1().encode_json(r#"{"name":"café"}"#);
        assert_eq!(bytes, b"{\"name\":\"caf\xe9\"}".to_vec());
    }

    #[test]
    fn latin1_escapes_what_it_cannot_map() {
        let bytes = Encoding::iso_8859_1().encode_json(r#"{"name":"café Ωmega"}"#);
        assert_eq!(bytes, b"{\"name\":\"caf\xe9 \\u03a9mega\"}".to_vec());
    }

    #[test]
    fn ascii_escapes_everything_else() {
        let bytes = Encoding::us_ascii().encode_json(r#"{"name":"café 🚀"}"#);
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, r#"{"name":"caf\u00e9 \ud83d\ude80"}"#);
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["name"], "café 🚀");
    }

    #[test]
    fn other_labels_use_their_charset() {
        let polish = Encoding::for_label("windows-1250").unwrap();
        assert_eq!(polish.name(), "windows-1250");
        // The rocket has no windows-1250 mapping.
        let bytes = polish.encode_json(r#"{"city":"Łódź 🚀"}"#);
        assert_eq!(
            bytes,
            b"{\"city\":\"\xa3\xf3d\x9f \\ud83d\\ude80\"}".to_vec()
        );

        let euro = "ISO-8859-15".parse::<Encoding>().unwrap();
        assert_eq!(euro.encode_json(r#""€""#), b"\"\xa4\"".to_vec());
    }

    #[test]
    fn utf8_is_passthrough() {
        let json = r#"{"name":"café"}"#;
        assert_eq!(Encoding::utf8().encode_json(json), json.as_bytes());
    }
}
