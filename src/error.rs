//! Unified client error model.
//! Every remote call, token decode and validation failure maps into `ClientError`
//! so callers (session manager, sync services, CLI) handle one taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientError {
    /// Bad login. Message is always generic; never says which field was wrong.
    Credentials { message: String },
    /// Bearer-authenticated call rejected (401) or refresh exchange failed.
    Auth { message: String },
    /// Client- or server-side validation; server non-field errors pass through verbatim.
    Validation { message: String },
    NotFound { message: String },
    /// Any other non-2xx response.
    Api { status: u16, message: String },
    /// Malformed token or unexpected response shape.
    Decode { message: String },
    /// Transport-level failure (connect, timeout, TLS).
    Io { message: String },
}

impl ClientError {
    pub fn credentials<S: Into<String>>(msg: S) -> Self { ClientError::Credentials { message: msg.into() } }
    pub fn auth<S: Into<String>>(msg: S) -> Self { ClientError::Auth { message: msg.into() } }
    pub fn validation<S: Into<String>>(msg: S) -> Self { ClientError::Validation { message: msg.into() } }
    pub fn not_found<S: Into<String>>(msg: S) -> Self { ClientError::NotFound { message: msg.into() } }
    pub fn api<S: Into<String>>(status: u16, msg: S) -> Self { ClientError::Api { status, message: msg.into() } }
    pub fn decode<S: Into<String>>(msg: S) -> Self { ClientError::Decode { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { ClientError::Io { message: msg.into() } }

    pub fn message(&self) -> &str {
        match self {
            ClientError::Credentials { message }
            | ClientError::Auth { message }
            | ClientError::Validation { message }
            | ClientError::NotFound { message }
            | ClientError::Api { message, .. }
            | ClientError::Decode { message }
            | ClientError::Io { message } => message.as_str(),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            ClientError::Credentials { .. } => "credentials",
            ClientError::Auth { .. } => "auth",
            ClientError::Validation { .. } => "validation",
            ClientError::NotFound { .. } => "not_found",
            ClientError::Api { .. } => "api",
            ClientError::Decode { .. } => "decode",
            ClientError::Io { .. } => "io",
        }
    }

    /// True when the failure means the session itself is no longer usable.
    pub fn is_auth(&self) -> bool { matches!(self, ClientError::Auth { .. }) }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Api { status, message } => write!(f, "api ({}): {}", status, message),
            other => write!(f, "{}: {}", other.kind_str(), other.message()),
        }
    }
}

impl std::error::Error for ClientError {}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Io { message: err.to_string() }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode { message: err.to_string() }
    }
}
