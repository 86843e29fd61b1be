//! SASL XOAUTH2 initial response.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Builds the base64 XOAUTH2 token sent with `AUTHENTICATE XOAUTH2`.
///
/// Format before encoding: `user=<user>\x01auth=Bearer <token>\x01\x01`
#[must_use]
pub fn build_xoauth2_token(user: &str, access_token: &str) -> String {
    let auth_string = format!("user={user}\x01auth=Bearer {access_token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}
