//! Configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Settings for [`RemoteStore`](crate::remote::RemoteStore).
///
/// ```toml
/// request_timeout_ms = 250
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// How long a request may wait for its response before the pending
    /// entry is dropped and the caller gets `RemoteError::Timeout`. `None`
    /// waits forever.
    pub request_timeout_ms: Option<u64>,
}

impl RemoteConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_waits_forever() {
        assert_eq!(RemoteConfig::default().request_timeout(), None);
        assert_eq!(RemoteConfig::from_toml("").unwrap(), RemoteConfig::default());
    }

    #[test]
    fn parses_timeout() {
        let config = RemoteConfig::from_toml("request_timeout_ms = 250").unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(
            RemoteConfig::default().with_request_timeout(Duration::from_secs(2)),
            RemoteConfig {
                request_timeout_ms: Some(2000)
            }
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(RemoteConfig::from_toml("timeout = 1").is_err());
        assert!(RemoteConfig::from_toml("request_timeout_ms = \"soon\"").is_err());
    }
}
