//! Client configuration
//!
//! Settings come from code or from the environment:
//!
//! - `B2_AUTH_URL`: authorization endpoint override (testing, private deployments)
//! - `B2_TIMEOUT_SECS`: per-request timeout; unset means no timeout
//! - `B2_ACCOUNT_ID` / `B2_APPLICATION_KEY`: credentials
//!   (`B2_KEY_ID` / `B2_KEY` are accepted as fallbacks)

use std::env;
use std::fmt;
use std::time::Duration;

use tracing::warn;

/// B2 authorization endpoint (v1 flat response layout)
pub const DEFAULT_AUTH_URL: &str = "https://api.backblazeb2.com/b2api/v1/b2_authorize_account";

/// Settings for constructing a [`crate::B2Client`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Absolute URL of b2_authorize_account
    pub auth_url: String,
    /// Applied to every request when set
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Build a config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("B2_AUTH_URL").filter(|u| !u.is_empty()) {
            config.auth_url = url;
        }

        if let Some(raw) = lookup("B2_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Some(Duration::from_secs(secs)),
                _ => warn!(value = %raw, "Ignoring invalid B2_TIMEOUT_SECS"),
            }
        }

        config
    }
}

/// Account id and application key pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub application_key: String,
}

// Keep the application key out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("application_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, application_key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            application_key: application_key.into(),
        }
    }

    /// Read credentials from the environment, if both halves are present
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let first = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(*name).filter(|v| !v.is_empty()))
        };

        let account_id = first(&["B2_ACCOUNT_ID", "B2_KEY_ID"])?;
        let application_key = first(&["B2_APPLICATION_KEY", "B2_KEY"])?;
        Some(Self::new(account_id, application_key))
    }
}
