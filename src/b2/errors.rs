//! B2 API Error Types
//!
//! Every failure surfaces as one of a few kinds: the identity endpoint refused
//! the credentials, a remote call failed (4xx, 5xx or no response at all), or
//! the local side could not produce the request (file read, header encoding).

use serde::Deserialize;
use std::path::PathBuf;

/// Result alias for B2 operations
pub type Result<T> = std::result::Result<T, B2Error>;

/// B2 API error types
#[derive(Debug, thiserror::Error)]
pub enum B2Error {
    /// Authorization was rejected, or the client has no session yet.
    #[error("{0}")]
    Auth(String),

    /// A remote call failed. `status` is `None` when no response arrived.
    #[error("{message}")]
    Api {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid request: {0}")]
    InvalidInput(String),
}

/// Error body returned by B2 on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl B2Error {
    /// Create a B2Error from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let code = parsed.as_ref().and_then(|b| b.code.clone());
        let detail = parsed
            .and_then(|b| b.message)
            .unwrap_or_else(|| body.trim().to_string());

        let message = match status {
            400..=499 => detail,
            500..=599 => format!("server error ({}): {}", status, detail),
            _ => format!("unexpected HTTP {}: {}", status, detail),
        };

        B2Error::Api {
            status: Some(status),
            code,
            message,
        }
    }

    /// Map a failed authorize response: client errors become `Auth`
    pub fn from_auth_status(status: u16, body: &str) -> Self {
        match Self::from_status(status, body) {
            B2Error::Api { message, .. } if (400..500).contains(&status) => B2Error::Auth(message),
            other => other,
        }
    }

    /// No response was received (DNS, connect, timeout, reset)
    pub fn transport(err: reqwest::Error) -> Self {
        B2Error::Api {
            status: None,
            code: None,
            message: format!("transport failure: {}", err),
        }
    }

    /// A 2xx response whose body could not be decoded
    pub fn invalid_body(status: u16, err: serde_json::Error) -> Self {
        B2Error::Api {
            status: Some(status),
            code: None,
            message: format!("invalid response body: {}", err),
        }
    }

    pub fn not_authorized() -> Self {
        B2Error::Auth("client is not authorized; call authorize first".to_string())
    }

    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            B2Error::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// B2 error code (e.g. "bad_auth_token"), if the server sent one
    pub fn code(&self) -> Option<&str> {
        match self {
            B2Error::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, B2Error::Auth(_))
    }

    /// Whether the failure happened on the server side or in transit
    pub fn is_server_error(&self) -> bool {
        match self {
            B2Error::Api { status: None, .. } => true,
            B2Error::Api {
                status: Some(s), ..
            } => *s >= 500,
            _ => false,
        }
    }
}
