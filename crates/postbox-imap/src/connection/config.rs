//! Connection configuration types.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::mailbox::SpecialUseTable;
use crate::protocol::Timings;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 143). **Not recommended for production.**
    None,
    /// Start with plaintext, upgrade with STARTTLS (port 143).
    StartTls,
    /// TLS from the start (port 993). **Recommended.**
    #[default]
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls => 143,
            Self::Implicit => 993,
        }
    }
}

/// Login credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `LOGIN user password`.
    Password {
        /// Login name.
        user: String,
        /// Plain password; never logged.
        password: String,
    },
    /// `AUTHENTICATE XOAUTH2` with an OAuth2 bearer token.
    XOAuth2 {
        /// Account address.
        user: String,
        /// Bearer token; never logged.
        access_token: String,
    },
}

impl Credentials {
    /// LOGIN with a password.
    #[must_use]
    pub fn password(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            user: user.into(),
            password: password.into(),
        }
    }

    /// AUTHENTICATE XOAUTH2 with an OAuth access token.
    #[must_use]
    pub fn xoauth2(user: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::XOAuth2 {
            user: user.into(),
            access_token: access_token.into(),
        }
    }

    /// Returns the user name.
    #[must_use]
    pub fn user(&self) -> &str {
        match self {
            Self::Password { user, .. } | Self::XOAuth2 { user, .. } => user,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Password { .. } => "Password",
            Self::XOAuth2 { .. } => "XOAuth2",
        };
        f.debug_struct(kind)
            .field("user", &self.user())
            .finish_non_exhaustive()
    }
}

/// IMAP session configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Bound on connecting and on waiting for the greeting.
    pub connect_timeout: Duration,
    /// Longest silence tolerated while a command awaits completion.
    pub response_timeout: Duration,
    /// Pause after the last command before the idle cycle starts.
    pub enter_idle_delay: Duration,
    /// How long an IDLE runs before it is renewed.
    pub idle_timeout: Duration,
    /// Keepalive period for servers without IDLE.
    pub noop_interval: Duration,
    /// Refuse to run over an unencrypted transport.
    pub require_tls: bool,
    /// Never attempt STARTTLS.
    pub ignore_tls: bool,
    /// Negotiate `COMPRESS=DEFLATE` after login when offered.
    pub enable_compression: bool,
    /// Credentials to log in with during connection setup.
    pub auth: Option<Credentials>,
    /// Client identification sent with the ID command.
    pub client_id: Option<BTreeMap<String, String>>,
    /// Localized names used to detect special-use mailboxes.
    pub special_use: SpecialUseTable,
}

impl Config {
    /// Creates a new configuration with implicit TLS on port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Timer settings for the protocol executor.
    #[must_use]
    pub fn timings(&self) -> Timings {
        Timings {
            connect_timeout: self.connect_timeout,
            response_timeout: self.response_timeout,
            enter_idle_delay: self.enter_idle_delay,
            idle_timeout: self.idle_timeout,
            noop_interval: self.noop_interval,
        }
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    timings: Timings,
    require_tls: bool,
    ignore_tls: bool,
    enable_compression: bool,
    auth: Option<Credentials>,
    client_id: Option<BTreeMap<String, String>>,
    special_use: SpecialUseTable,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Implicit,
            timings: Timings::default(),
            require_tls: false,
            ignore_tls: false,
            enable_compression: false,
            auth: None,
            client_id: None,
            special_use: SpecialUseTable::default(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connection and greeting timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timings.connect_timeout = timeout;
        self
    }

    /// How long to wait for a command to complete.
    #[must_use]
    pub const fn response_timeout(mut self, timeout: Duration) -> Self {
        self.timings.response_timeout = timeout;
        self
    }

    /// Quiet time before IDLE (or NOOP polling) starts.
    #[must_use]
    pub const fn enter_idle_delay(mut self, delay: Duration) -> Self {
        self.timings.enter_idle_delay = delay;
        self
    }

    /// How long one IDLE lasts before it is renewed.
    #[must_use]
    pub const fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.timings.idle_timeout = timeout;
        self
    }

    /// NOOP period on servers without IDLE.
    #[must_use]
    pub const fn noop_interval(mut self, interval: Duration) -> Self {
        self.timings.noop_interval = interval;
        self
    }

    /// Fail setup unless the connection ends up encrypted.
    #[must_use]
    pub const fn require_tls(mut self, require: bool) -> Self {
        self.require_tls = require;
        self
    }

    /// Never attempt STARTTLS.
    #[must_use]
    pub const fn ignore_tls(mut self, ignore: bool) -> Self {
        self.ignore_tls = ignore;
        self
    }

    /// Use COMPRESS=DEFLATE when the server offers it.
    #[must_use]
    pub const fn enable_compression(mut self, enable: bool) -> Self {
        self.enable_compression = enable;
        self
    }

    /// Sets credentials used during connection setup.
    #[must_use]
    pub fn auth(mut self, credentials: Credentials) -> Self {
        self.auth = Some(credentials);
        self
    }

    /// Sets the client ID sent when the server supports `ID`.
    #[must_use]
    pub fn client_id<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.client_id = Some(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Replaces the special-use name table.
    #[must_use]
    pub fn special_use(mut self, table: SpecialUseTable) -> Self {
        self.special_use = table;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            connect_timeout: self.timings.connect_timeout,
            response_timeout: self.timings.response_timeout,
            enter_idle_delay: self.timings.enter_idle_delay,
            idle_timeout: self.timings.idle_timeout,
            noop_interval: self.timings.noop_interval,
            require_tls: self.require_tls,
            ignore_tls: self.ignore_tls,
            enable_compression: self.enable_compression,
            auth: self.auth,
            client_id: self.client_id,
            special_use: self.special_use,
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
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 143);
        assert_eq!(Security::StartTls.default_port(), 143);
        assert_eq!(Security::Implicit.default_port(), 993);
    }

    #[test]
    fn test_config_new() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.connect_timeout, Duration::from_secs(90));
        assert_eq!(config.response_timeout, Duration::from_secs(60));
        assert_eq!(config.enter_idle_delay, Duration::from_secs(1));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.noop_interval, Duration::from_secs(60));
        assert!(!config.require_tls && !config.ignore_tls && !config.enable_compression);
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("imap.example.com")
            .security(Security::StartTls)
            .connect_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .require_tls(true)
            .auth(Credentials::password("user", "secret"))
            .client_id([("name", "postbox")])
            .build();

        assert_eq!(config.port, 143);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.timings().idle_timeout, Duration::from_secs(300));
        assert!(config.require_tls);
        assert_eq!(config.auth.as_ref().map(Credentials::user), Some("user"));
        assert_eq!(
            config.client_id.unwrap().get("name").map(String::as_str),
            Some("postbox")
        );
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let rendered = format!("{:?}", Credentials::xoauth2("user", "ya29.token"));
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("ya29"));
    }
}
