use std::time::Duration;

use crate::errors::CompareError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for the comparison API client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the comparison API (without the `/api` suffix).
    pub base_url: String,
    /// Timeout for plain JSON requests. Stream requests only use
    /// `connect_timeout`, since a healthy stream can stay open for minutes.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Bounded buffer between the stream task and the aggregator.
    pub stream_buffer_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    /// Creates a config with sensible defaults for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            stream_buffer_capacity: 128,
        }
    }

    /// Builds a config from `COMPARE_API_BASE_URL` and `COMPARE_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, CompareError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CompareError> {
        let base_url = lookup("COMPARE_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);
        if let Some(raw) = lookup("COMPARE_HTTP_TIMEOUT_SECS").filter(|v| !v.trim().is_empty()) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                CompareError::Config(format!("COMPARE_HTTP_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), CompareError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CompareError::Config(format!(
                "base_url must start with http:// or https://: {url}"
            )));
        }
        if self.stream_buffer_capacity == 0 {
            return Err(CompareError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_env_is_empty() {
        let config = ClientConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.stream_buffer_capacity, 128);
    }

    #[test]
    fn reads_base_url_and_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("COMPARE_API_BASE_URL", "https://compare.internal/"),
            ("COMPARE_HTTP_TIMEOUT_SECS", "5"),
        ]))
        .expect("config");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.api_url("/prompts"), "https://compare.internal/api/prompts");
    }

    #[test]
    fn rejects_bad_timeout_and_scheme() {
        let err = ClientConfig::from_lookup(lookup(&[("COMPARE_HTTP_TIMEOUT_SECS", "soon")]))
            .expect_err("bad timeout");
        assert!(matches!(err, CompareError::Config(msg) if msg.contains("not a number")));

        let err = ClientConfig::from_lookup(lookup(&[("COMPARE_API_BASE_URL", "localhost:8000")]))
            .expect_err("bad scheme");
        assert!(matches!(err, CompareError::Config(_)));
    }

    #[test]
    fn zero_buffer_is_invalid() {
        let err = ClientConfig::default()
            .stream_buffer_capacity(0)
            .validate()
            .expect_err("zero buffer");
        assert!(matches!(err, CompareError::Config(msg) if msg.contains("stream_buffer_capacity")));
    }
}
