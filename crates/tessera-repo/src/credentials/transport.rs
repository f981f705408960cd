//! Transport parameters bound to one remote.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Credentials;

/// Connection parameters shared by every remote operation.
///
/// Passed explicitly to the [`CredentialBinder`](super::CredentialBinder)
/// at construction; nothing reads transport settings from globals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportSettings {
    /// Connect and stall timeout of remote operations, in seconds.
    #[serde(default = "default_timeout", with = "crate::settings::duration_secs")]
    pub timeout: Duration,

    /// HTTP(S) proxy URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Whether to skip TLS certificate verification (not recommended).
    #[serde(default)]
    pub skip_ssl_verification: bool,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            proxy: None,
            skip_ssl_verification: false,
        }
    }
}

/// Credentials and transport settings bound to one remote URI.
///
/// Built once per URI by the binder and shared by every operation on the
/// working copies of that remote.
#[derive(Clone, PartialEq, Eq)]
pub struct BoundTransport {
    uri: String,
    credentials: Credentials,
    settings: TransportSettings,
}

impl BoundTransport {
    pub fn new(uri: impl Into<String>, credentials: Credentials, settings: TransportSettings) -> Self {
        Self {
            uri: uri.into(),
            credentials,
            settings,
        }
    }

    /// A transport without credentials and with default settings.
    pub fn anonymous(uri: impl Into<String>) -> Self {
        Self::new(uri, Credentials::Anonymous, TransportSettings::default())
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// Timeout in whole seconds, never zero.
    pub fn timeout_secs(&self) -> u64 {
        self.settings.timeout.as_secs().max(1)
    }
}

impl fmt::Debug for BoundTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundTransport")
            .field("uri", &self.uri)
            .field("credentials", &self.credentials)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings: TransportSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, TransportSettings::default());
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_timeout_in_seconds() {
        let settings: TransportSettings =
            serde_json::from_str(r#"{"timeout": 0, "proxy": "http://proxy:3128"}"#).unwrap();
        let bound = BoundTransport::new("https://a", Credentials::Anonymous, settings);
        assert_eq!(bound.timeout_secs(), 1);
        assert_eq!(bound.settings().proxy.as_deref(), Some("http://proxy:3128"));
    }

    #[test]
    fn test_debug_hides_password() {
        let bound = BoundTransport::new(
            "https://a",
            Credentials::Basic {
                username: "u".into(),
                password: "hunter2".into(),
            },
            TransportSettings::default(),
        );
        assert!(!format!("{bound:?}").contains("hunter2"));
    }
}
