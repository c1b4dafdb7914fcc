//! Client-side JWT payload decoding.
//!
//! Pure and stateless: splits the compact form, base64url-decodes the payload
//! segment and parses the claims JSON. The signature is deliberately not
//! verified here; the client only needs the embedded user id and expiry, and
//! the server re-validates every bearer token anyway. Decode failures are a
//! recoverable condition reported to the caller, never a panic.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::models::User;

/// Claims carried in the access token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Issued-at, seconds since epoch.
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Claims {
    /// Advisory ownership check: edit/delete affordances are shown only to the
    /// card owner. The server enforces the real rule.
    pub fn owns(&self, user: &User) -> bool { self.user_id == user.id }

    pub fn expires_at(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("token is not in compact JWT form")]
    NotCompact,
    #[error("payload is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("claims are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<DecodeError> for ClientError {
    fn from(err: DecodeError) -> Self { ClientError::decode(err.to_string()) }
}

/// Decode the claims of an access token. Fails on anything that is not a
/// three-segment compact JWT with a JSON object payload.
pub fn decode(access: &str) -> ClientResult<Claims> {
    Ok(decode_inner(access)?)
}

fn decode_inner(access: &str) -> Result<Claims, DecodeError> {
    let mut parts = access.split('.');
    let (Some(_header), Some(payload), Some(_sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(DecodeError::NotCompact);
    };
    if payload.is_empty() {
        return Err(DecodeError::NotCompact);
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.as_bytes())?;
    let claims: Claims = serde_json::from_slice(&bytes)?;
    Ok(claims)
}
