//! Capabilities, connection upgrades, identification and authentication.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::super::config::Credentials;
use super::Client;
use crate::codec::build_xoauth2_token;
use crate::parser::parse_id;
use crate::syntax::{Attribute, Command};
use crate::types::SessionState;
use crate::{Error, Result};

impl Client {
    /// Refreshes the capability set.
    ///
    /// Returns `false` without any I/O when capabilities are already known
    /// and `force` is not set, or when TLS is required but the connection is
    /// still in plain text.
    pub async fn update_capability(&self, force: bool) -> Result<bool> {
        if !force && !self.capabilities().is_empty() {
            return Ok(false);
        }
        if self.config.require_tls && !self.is_secure() {
            return Ok(false);
        }

        self.execute("CAPABILITY", &["CAPABILITY"]).await?;
        Ok(true)
    }

    /// Upgrades a plain connection with STARTTLS.
    ///
    /// Returns `false` if the connection is already secure or the server does
    /// not offer STARTTLS. Capabilities are forgotten after an upgrade.
    pub async fn upgrade_connection(&self) -> Result<bool> {
        if self.is_secure() || !self.has_capability("STARTTLS") {
            return Ok(false);
        }

        self.execute("STARTTLS", &[]).await?;
        self.shared.session().capabilities.clear();
        info!("connection upgraded with STARTTLS");
        Ok(true)
    }

    /// Enables `COMPRESS=DEFLATE` when configured and offered.
    pub async fn compress_connection(&self) -> Result<bool> {
        if !self.config.enable_compression || !self.has_capability("COMPRESS=DEFLATE") {
            return Ok(false);
        }

        let command = Command::new("COMPRESS").arg(Attribute::atom("DEFLATE"));
        self.execute(command, &[]).await?;
        Ok(true)
    }

    /// Exchanges client and server identification (RFC 2971).
    ///
    /// Sends `NIL` when `id` is `None` or empty. Returns `None` if the server
    /// does not support ID.
    pub async fn update_id(
        &self,
        id: Option<&BTreeMap<String, String>>,
    ) -> Result<Option<BTreeMap<String, String>>> {
        if !self.has_capability("ID") {
            return Ok(None);
        }

        let fields = match id {
            Some(fields) if !fields.is_empty() => Attribute::List(
                fields
                    .iter()
                    .flat_map(|(key, value)| {
                        [Attribute::string(key.as_str()), Attribute::string(value.as_str())]
                    })
                    .collect(),
            ),
            _ => Attribute::Nil,
        };

        let tree = self.execute(Command::new("ID").arg(fields), &["ID"]).await?;
        Ok(Some(parse_id(&tree)))
    }

    /// Authenticates with a password (`LOGIN`) or an OAuth2 token
    /// (`AUTHENTICATE XOAUTH2`).
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        let command = match credentials {
            Credentials::XOAuth2 { user, access_token } => {
                if !self.has_capability("AUTH=XOAUTH2") {
                    return Err(Error::Unsupported("AUTH=XOAUTH2".to_string()));
                }
                let token = build_xoauth2_token(user, access_token);
                Command::new("AUTHENTICATE")
                    .arg(Attribute::atom("XOAUTH2"))
                    .arg(Attribute::atom(token).sensitive())
            }
            Credentials::Password { user, password } => Command::new("LOGIN")
                .arg(Attribute::string(user.as_str()))
                .arg(Attribute::string(password.as_str()).sensitive()),
        };

        let tree = self.execute(command, &["CAPABILITY"]).await?;
        self.shared.change_state(SessionState::Authenticated);
        debug!(user = credentials.user(), "logged in");

        let carried_capabilities = !tree.records("CAPABILITY").is_empty()
            || tree.response.code.as_deref() == Some("CAPABILITY");
        if !carried_capabilities {
            self.shared.session().capabilities.clear();
            self.update_capability(true).await?;
        }
        Ok(())
    }

    /// Sends LOGOUT and stops the session.
    ///
    /// The connection is torn down whether or not the server acknowledges;
    /// a server that hangs up right after `* BYE` still counts as success.
    pub async fn logout(&self) -> Result<()> {
        if self.state() == SessionState::Logout {
            self.shutdown().await;
            return Ok(());
        }

        let result = self.execute("LOGOUT", &["BYE"]).await;
        self.shared.change_state(SessionState::Logout);
        self.shutdown().await;

        match result {
            Ok(_) | Err(Error::TransportClosed | Error::LoggedOut) => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// Like [`Client::logout`], but never fails.
    pub async fn close(&self) {
        if let Err(error) = self.logout().await {
            debug!(%error, "LOGOUT failed while closing");
        }
    }
}
