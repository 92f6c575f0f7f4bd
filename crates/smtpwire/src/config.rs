//! Connection configuration types.

use std::time::Duration;

use rustls::pki_types::CertificateDer;

use crate::protocol::timeout::{DEFAULT_LOWER_BOUND, DEFAULT_PER_BYTE_MS};
use crate::types::AuthMechanism;

/// Port used for implicit TLS (SMTPS).
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// Plain SMTP port.
pub const SMTP_PORT: u16 = 25;

/// Secret half of the credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    /// Password for PLAIN / LOGIN.
    Password(String),
    /// `OAuth2` access token for XOAUTH2.
    XOAuth2(String),
}

/// Credentials used to authenticate after the greeting.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub user: String,
    /// Password or access token.
    pub secret: Secret,
}

impl Credentials {
    /// Username and password credentials.
    #[must_use]
    pub fn password(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: Secret::Password(pass.into()),
        }
    }

    /// Username and `OAuth2` access token credentials.
    #[must_use]
    pub fn xoauth2(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: Secret::XOAuth2(token.into()),
        }
    }

    /// Returns the password, if these are password credentials.
    #[must_use]
    pub fn pass(&self) -> Option<&str> {
        match &self.secret {
            Secret::Password(p) => Some(p),
            Secret::XOAuth2(_) => None,
        }
    }

    /// Returns the access token, if these are `OAuth2` credentials.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match &self.secret {
            Secret::XOAuth2(t) => Some(t),
            Secret::Password(_) => None,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.secret {
            Secret::Password(_) => "password",
            Secret::XOAuth2(_) => "xoauth2",
        };
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &kind)
            .finish()
    }
}

/// SMTP client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// TLS from the first byte (SMTPS).
    pub use_secure_transport: bool,
    /// Client hostname announced in EHLO/LHLO/HELO.
    pub name: String,
    /// Credentials; `None` skips authentication.
    pub auth: Option<Credentials>,
    /// Forces an authentication mechanism.
    pub auth_method: Option<AuthMechanism>,
    /// Sends message data without dot-stuffing.
    pub disable_escaping: bool,
    /// Never upgrade with STARTTLS even if advertised.
    pub ignore_tls: bool,
    /// Fail unless the connection is or becomes TLS protected.
    pub require_tls: bool,
    /// Speak LMTP instead of SMTP.
    pub lmtp: bool,
    /// Minimum idle timeout window.
    pub timeout_lower_bound: Duration,
    /// Extra milliseconds of idle timeout per byte written.
    pub timeout_per_byte_ms: f64,
    /// Extra trusted root certificates (DER).
    pub ca_certs: Vec<CertificateDer<'static>>,
}

impl Config {
    /// Creates a configuration for plain SMTP on port 25.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    use_secure_transport: Option<bool>,
    name: String,
    auth: Option<Credentials>,
    auth_method: Option<AuthMechanism>,
    disable_escaping: bool,
    ignore_tls: bool,
    require_tls: bool,
    lmtp: bool,
    timeout_lower_bound: Duration,
    timeout_per_byte_ms: f64,
    ca_certs: Vec<CertificateDer<'static>>,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            use_secure_transport: None,
            name: "localhost".to_string(),
            auth: None,
            auth_method: None,
            disable_escaping: false,
            ignore_tls: false,
            require_tls: false,
            lmtp: false,
            timeout_lower_bound: DEFAULT_LOWER_BOUND,
            timeout_per_byte_ms: DEFAULT_PER_BYTE_MS,
            ca_certs: Vec::new(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Enables or disables implicit TLS.
    #[must_use]
    pub const fn use_secure_transport(mut self, secure: bool) -> Self {
        self.use_secure_transport = Some(secure);
        self
    }

    /// Sets the client hostname.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn auth(mut self, credentials: Credentials) -> Self {
        self.auth = Some(credentials);
        self
    }

    /// Forces an authentication mechanism.
    #[must_use]
    pub const fn auth_method(mut self, method: AuthMechanism) -> Self {
        self.auth_method = Some(method);
        self
    }

    /// Disables dot-stuffing of message data.
    #[must_use]
    pub const fn disable_escaping(mut self, disable: bool) -> Self {
        self.disable_escaping = disable;
        self
    }

    /// Ignores an advertised STARTTLS.
    #[must_use]
    pub const fn ignore_tls(mut self, ignore: bool) -> Self {
        self.ignore_tls = ignore;
        self
    }

    /// Requires TLS.
    #[must_use]
    pub const fn require_tls(mut self, require: bool) -> Self {
        self.require_tls = require;
        self
    }

    /// Speaks LMTP.
    #[must_use]
    pub const fn lmtp(mut self, lmtp: bool) -> Self {
        self.lmtp = lmtp;
        self
    }

    /// Sets the idle timeout parameters.
    #[must_use]
    pub const fn timeout(mut self, lower_bound: Duration, per_byte_ms: f64) -> Self {
        self.timeout_lower_bound = lower_bound;
        self.timeout_per_byte_ms = per_byte_ms;
        self
    }

    /// Adds a trusted root certificate.
    #[must_use]
    pub fn ca_cert(mut self, cert: CertificateDer<'static>) -> Self {
        self.ca_certs.push(cert);
        self
    }

    /// Builds the configuration.
    ///
    /// Without an explicit choice, implicit TLS is used exactly when the
    /// port is 465, and the port defaults to 465 or 25 accordingly.
    #[must_use]
    pub fn build(self) -> Config {
        let use_secure_transport = self
            .use_secure_transport
            .unwrap_or(self.port == Some(IMPLICIT_TLS_PORT));
        let port = self.port.unwrap_or(if use_secure_transport {
            IMPLICIT_TLS_PORT
        } else {
            SMTP_PORT
        });

        Config {
            host: self.host,
            port,
            use_secure_transport,
            name: self.name,
            auth: self.auth,
            auth_method: self.auth_method,
            disable_escaping: self.disable_escaping,
            ignore_tls: self.ignore_tls,
            require_tls: self.require_tls,
            lmtp: self.lmtp,
            timeout_lower_bound: self.timeout_lower_bound,
            timeout_per_byte_ms: self.timeout_per_byte_ms,
            ca_certs: self.ca_certs,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_defaults() {
        let config = Config::new("smtp.example.com");
        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 25);
        assert!(!config.use_secure_transport);
        assert_eq!(config.name, "localhost");
        assert!(config.auth.is_none());
        assert_eq!(config.timeout_lower_bound, Duration::from_secs(10));
    }

    #[test]
    fn test_port_465_implies_tls() {
        let config = Config::builder("smtp.example.com").port(465).build();
        assert!(config.use_secure_transport);
    }

    #[test]
    fn test_tls_implies_port_465() {
        let config = Config::builder("smtp.example.com")
            .use_secure_transport(true)
            .build();
        assert_eq!(config.port, 465);
    }

    #[test]
    fn test_explicit_choice_wins() {
        let config = Config::builder("smtp.example.com")
            .port(465)
            .use_secure_transport(false)
            .build();
        assert!(!config.use_secure_transport);
        assert_eq!(config.port, 465);
    }

    #[test]
    fn test_builder_flags() {
        let config = Config::builder("lmtp.local")
            .port(24)
            .name("client.local")
            .auth(Credentials::password("abc", "def"))
            .auth_method(AuthMechanism::Login)
            .lmtp(true)
            .require_tls(true)
            .ignore_tls(true)
            .disable_escaping(true)
            .timeout(Duration::from_secs(1), 1.0)
            .build();

        assert_eq!(config.port, 24);
        assert_eq!(config.name, "client.local");
        assert_eq!(config.auth_method, Some(AuthMechanism::Login));
        assert!(config.lmtp && config.require_tls && config.ignore_tls && config.disable_escaping);
        assert_eq!(config.timeout_lower_bound, Duration::from_secs(1));
    }

    #[test]
    fn test_credentials_accessors() {
        let pw = Credentials::password("u", "p");
        assert_eq!(pw.pass(), Some("p"));
        assert_eq!(pw.token(), None);

        let oauth = Credentials::xoauth2("u", "t");
        assert_eq!(oauth.pass(), None);
        assert_eq!(oauth.token(), Some("t"));
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let debug = format!("{:?}", Credentials::password("user", "hunter2"));
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }
}
