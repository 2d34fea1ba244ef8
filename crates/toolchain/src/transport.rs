//! Fetching remote resources.
//!
//! The [`Transport`] trait abstracts where bytes come from so callers can be
//! tested without network access.
//!
//! # Testing
//!
//! ```
//! use toolchain::transport::{MockTransport, Transport};
//!
//! let mock = MockTransport::new();
//! mock.add_response("https://example.com/key.asc", b"key".to_vec());
//!
//! assert_eq!(mock.fetch("https://example.com/key.asc").unwrap(), b"key");
//! assert_eq!(mock.fetch("https://example.com/missing").unwrap_err().exit_code, 22);
//! ```

use crate::error::{EXIT_HTTP_STATUS, TransportError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Maximum download size (source tarballs are well below this).
const MAX_BODY_SIZE: u64 = 200 * 1024 * 1024;

/// Overall time budget for one request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Source of remote bytes.
pub trait Transport: Send + Sync {
    /// Fetch the full body at `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// HTTP(S) transport backed by `ureq`.
pub struct HttpTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpTransport {
    /// Create a transport identifying itself as `user_agent`.
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: config.into(),
            user_agent: user_agent.into(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(concat!("toolchain-rs/", env!("CARGO_PKG_VERSION")))
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        log::debug!("GET {url}");

        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| TransportError::from_ureq(url, &e))?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| TransportError::from_ureq(url, &e))?;

        log::debug!("received {} bytes from {url}", bytes.len());
        Ok(bytes)
    }
}

/// Mock transport serving canned responses from memory.
///
/// Unknown URLs fail like an HTTP 404. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<HashMap<String, Result<Vec<u8>, TransportError>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    /// Create a new empty mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn add_response(&self, url: impl Into<String>, body: Vec<u8>) {
        lock(&self.responses).insert(url.into(), Ok(body));
    }

    /// Fail requests for `url` with the given exit code.
    pub fn add_failure(&self, url: impl Into<String>, exit_code: i32) {
        let url = url.into();
        let err = TransportError::new(&url, "mock failure", exit_code);
        lock(&self.responses).insert(url, Err(err));
    }

    /// Every requested URL, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }
}

impl Transport for MockTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        lock(&self.requests).push(url.to_string());

        lock(&self.responses)
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::new(url, "HTTP 404", EXIT_HTTP_STATUS)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_CONNECT;

    #[test]
    fn test_mock_transport_serves_response() {
        let mock = MockTransport::new();
        mock.add_response("https://example.com/a", vec![1, 2, 3]);

        assert_eq!(mock.fetch("https://example.com/a").unwrap(), vec![1, 2, 3]);
        assert_eq!(mock.requests(), vec!["https://example.com/a"]);
    }

    #[test]
    fn test_mock_transport_unknown_url_is_404() {
        let mock = MockTransport::new();
        let err = mock.fetch("https://example.com/nope").unwrap_err();
        assert_eq!(err.exit_code, EXIT_HTTP_STATUS);
        assert_eq!(err.url, "https://example.com/nope");
    }

    #[test]
    fn test_mock_transport_failure() {
        let mock = MockTransport::new();
        mock.add_failure("https://example.com/down", EXIT_CONNECT);

        let err = mock.fetch("https://example.com/down").unwrap_err();
        assert_eq!(err.exit_code, EXIT_CONNECT);
    }

    #[test]
    fn test_mock_transport_clones_share_state() {
        let mock = MockTransport::new();
        let other = mock.clone();
        other.add_response("u", vec![]);
        assert!(mock.fetch("u").is_ok());
        assert_eq!(other.requests().len(), 1);
    }
}
