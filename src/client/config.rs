//! Connection configuration and backoff schedule.

use std::time::Duration;

use crate::traits::Headers;

/// Configuration for [`SseClient`](super::SseClient).
#[derive(Debug, Clone)]
pub struct SseClientConfig {
    /// Stream URL (single long-lived GET).
    pub url: String,
    /// Extra request headers, merged over the protocol-required ones.
    pub headers: Headers,
    /// Declare the connection dead after this long without any bytes.
    pub heartbeat_timeout: Duration,
    /// Base reconnect interval. The server may replace it via `retry:`.
    pub base_retry_interval: Duration,
    /// Consecutive failures tolerated before the terminal Closed state.
    pub max_retries: u32,
    /// Upper bound on a single backoff delay.
    pub max_retry_delay: Duration,
    /// Close the connection when the `[DONE]` sentinel arrives.
    pub auto_close_on_done: bool,
    /// Skip records whose `id:` was already seen on this client.
    pub dedup_by_id: bool,
}

impl SseClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Headers::new(),
            heartbeat_timeout: Duration::from_secs(30),
            base_retry_interval: Duration::from_secs(3),
            max_retries: 10,
            max_retry_delay: Duration::from_secs(30),
            auto_close_on_done: true,
            dedup_by_id: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    pub fn with_base_retry_interval(mut self, interval: Duration) -> Self {
        self.base_retry_interval = interval;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_retry_delay(mut self, cap: Duration) -> Self {
        self.max_retry_delay = cap;
        self
    }

    pub fn with_auto_close_on_done(mut self, auto_close: bool) -> Self {
        self.auto_close_on_done = auto_close;
        self
    }

    pub fn with_dedup_by_id(mut self, dedup: bool) -> Self {
        self.dedup_by_id = dedup;
        self
    }
}

/// Retry bookkeeping carried across reconnects for resumption.
#[derive(Debug, Clone)]
pub(crate) struct RetryState {
    /// Consecutive failures since the last successful open.
    pub retry_count: u32,
    /// Current base interval, server-adjustable via `retry:`.
    pub base_interval: Duration,
    /// Most recent `id:` seen, sent back as `Last-Event-ID`.
    pub last_event_id: Option<String>,
}

/// Backoff delay for the n-th consecutive failure:
/// `min(base * 2^(n-1), cap)`.
pub(crate) fn backoff_delay(base: Duration, retry_count: u32, cap: Duration) -> Duration {
    let exponent = retry_count.saturating_sub(1).min(20);
    base.saturating_mul(1u32 << exponent).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SseClientConfig::new("http://example.com/stream");
        assert_eq!(config.url, "http://example.com/stream");
        assert!(config.headers.is_empty());
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(30));
        assert_eq!(config.base_retry_interval, Duration::from_secs(3));
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.max_retry_delay, Duration::from_secs(30));
        assert!(config.auto_close_on_done);
        assert!(!config.dedup_by_id);
    }

    #[test]
    fn test_config_builders() {
        let config = SseClientConfig::new("http://example.com/stream")
            .with_header("Authorization", "Bearer token")
            .with_heartbeat_timeout(Duration::from_secs(10))
            .with_base_retry_interval(Duration::from_millis(500))
            .with_max_retries(3)
            .with_auto_close_on_done(false)
            .with_dedup_by_id(true);

        assert_eq!(
            config.headers.get("Authorization").map(String::as_str),
            Some("Bearer token")
        );
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(10));
        assert_eq!(config.base_retry_interval, Duration::from_millis(500));
        assert_eq!(config.max_retries, 3);
        assert!(!config.auto_close_on_done);
        assert!(config.dedup_by_id);
    }

    #[test]
    fn test_backoff_formula() {
        let base = Duration::from_secs(3);
        let cap = Duration::from_secs(30);

        // n-th consecutive failure: min(base * 2^(n-1), cap).
        assert_eq!(backoff_delay(base, 1, cap), Duration::from_secs(3));
        assert_eq!(backoff_delay(base, 2, cap), Duration::from_secs(6));
        assert_eq!(backoff_delay(base, 3, cap), Duration::from_secs(12));
        assert_eq!(backoff_delay(base, 4, cap), Duration::from_secs(24));
        assert_eq!(backoff_delay(base, 5, cap), Duration::from_secs(30));
        assert_eq!(backoff_delay(base, 10, cap), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_with_server_adjusted_base() {
        let cap = Duration::from_secs(30);
        let base = Duration::from_millis(250);
        assert_eq!(backoff_delay(base, 1, cap), Duration::from_millis(250));
        assert_eq!(backoff_delay(base, 4, cap), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        let base = Duration::from_secs(3);
        let cap = Duration::from_secs(30);
        assert_eq!(backoff_delay(base, u32::MAX, cap), cap);
    }
}
