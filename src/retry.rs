//! Retry budget and backoff for transient failures.
//!
//! A call makes at most [`RetryPolicy::max_attempts`] attempts. Only
//! transport errors and [`is_transient_status`] statuses are retried; the
//! delay before retry `n` (1-indexed) is `backoff_factor * 2^(n-1)`.

use http::{HeaderMap, StatusCode};
use std::time::{Duration, SystemTime};

/// How many attempts to make and how long to wait between them.
///
/// # Examples
///
/// ```
/// use chatads::RetryPolicy;
/// use std::time::Duration;
///
/// // Three attempts in total: wait 500ms, then 1s.
/// let policy = RetryPolicy::new(3, Duration::from_millis(500));
/// assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(500)));
/// assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_secs(1)));
/// assert_eq!(policy.delay_for_attempt(3), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `1` disables retries.
    pub max_attempts: usize,
    /// Base delay; doubled for each further retry.
    pub backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff_factor: Duration) -> Self {
        Self {
            max_attempts,
            backoff_factor,
        }
    }

    /// Returns the delay before retry `retry` (1-indexed), or `None` once
    /// the attempt budget is spent.
    pub fn delay_for_attempt(&self, retry: usize) -> Option<Duration> {
        if retry == 0 || retry >= self.max_attempts {
            return None;
        }

        let multiplier = 2u32.saturating_pow(u32::try_from(retry - 1).unwrap_or(u32::MAX));
        Some(self.backoff_factor.saturating_mul(multiplier))
    }

    /// Every delay this policy can wait, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).filter_map(|retry| self.delay_for_attempt(retry))
    }

    /// Upper bound on a single call: every attempt hitting `timeout` plus
    /// every backoff delay.
    pub fn worst_case_duration(&self, timeout: Duration) -> Duration {
        let attempts = u32::try_from(self.max_attempts).unwrap_or(u32::MAX);
        self.delays()
            .fold(timeout.saturating_mul(attempts), Duration::saturating_add)
    }
}

/// Statuses worth retrying: 429 and every 5xx.
pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Parses the `Retry-After` header.
///
/// Accepts delay-seconds (integer or decimal) and HTTP dates. Dates in the
/// past yield a zero delay.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(seconds) = header.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).ok();
    }

    let date_time = httpdate::parse_http_date(header).ok()?;
    Some(
        date_time
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));

        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for_attempt(4), Some(Duration::from_millis(800)));
        assert_eq!(policy.delay_for_attempt(5), None);
        assert_eq!(policy.delays().count(), 4);
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let policy = RetryPolicy::new(1, Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), None);
        assert_eq!(policy.delays().count(), 0);
    }

    #[test]
    fn test_worst_case_duration() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        // 3 x 10s timeouts + 500ms + 1s of backoff
        assert_eq!(
            policy.worst_case_duration(Duration::from_secs(10)),
            Duration::from_millis(31_500)
        );
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
        assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
        assert!(!is_transient_status(StatusCode::OK));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("60"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(60)));

        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_parse_retry_after_date() {
        let mut headers = HeaderMap::new();
        let future = SystemTime::now() + Duration::from_secs(120);
        headers.insert(
            "retry-after",
            HeaderValue::from_str(&httpdate::fmt_http_date(future)).unwrap(),
        );
        let delay = parse_retry_after(&headers).unwrap();
        assert!(delay > Duration::from_secs(100) && delay <= Duration::from_secs(120));

        headers.insert(
            "retry-after",
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_retry_after_garbage() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("-5"));
        assert_eq!(parse_retry_after(&headers), None);
    }
}
