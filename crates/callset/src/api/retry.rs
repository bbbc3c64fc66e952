//! Automatic retry with randomized exponential backoff.
//!
//! Retries transient HTTP/API errors (429, any 5xx, network timeouts).
//! Never retries 400 (bad request) or 401 (auth) errors. Classification
//! looks at the status code only. The last error is returned to the caller
//! once the attempt budget is spent.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (0 = fail immediately).
    pub max_retries: u32,
    /// Lower bound for any backoff delay.
    pub initial_delay: Duration,
    /// Upper bound for any backoff delay.
    pub max_delay: Duration,
    /// Backoff multiplier (typically 2.0 for exponential backoff).
    pub multiplier: f64,
    /// Pick a random delay between `initial_delay` and the exponential ceiling.
    pub jitter: bool,
}

impl Default for RetryConfig {
    /// Three attempts in total, waiting a random 1 to 40 s between them.
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(40),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a config with the given number of retries. Uses the default delays.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::with_retries(0)
    }

    /// Total number of attempts, including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Exponential ceiling for a given attempt number (0-indexed), clamped
    /// into `[initial_delay, max_delay]`.
    pub fn ceiling_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base
            .min(self.max_delay.as_secs_f64())
            .max(self.initial_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling_for_attempt(attempt);
        if !self.jitter || ceiling <= self.initial_delay {
            return ceiling;
        }
        let secs = rand::rng()
            .random_range(self.initial_delay.as_secs_f64()..=ceiling.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Status code from an `HTTP {status}` error string, if there is one.
fn http_status(error: &str) -> Option<u16> {
    let (_, rest) = error.split_once("HTTP ")?;
    rest.split(|c: char| !c.is_ascii_digit()).next()?.parse().ok()
}

/// Whether an error string indicates a transient (retryable) failure.
///
/// Errors that carry a status are judged by the status alone: 429 and any
/// 5xx are transient. The response body is never consulted.
pub fn is_transient_error(error: &str) -> bool {
    if let Some(status) = http_status(error) {
        return status == 429 || (500..600).contains(&status);
    }

    let lower = error.to_lowercase();
    [
        "request failed:",
        "failed to read response",
        "connection reset",
        "connection refused",
        "timed out",
        "timeout",
        "broken pipe",
        "network",
    ]
    .iter()
    .any(|p| lower.contains(p))
}

/// Whether an error is a permanent (non-retryable) failure.
pub fn is_permanent_error(error: &str) -> bool {
    matches!(http_status(error), Some(400 | 401 | 403 | 404 | 422))
}

/// Retry an async API call with backoff for transient errors.
pub async fn retry_api_call<T, F, Fut>(config: &RetryConfig, mut call: F) -> Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt < config.max_retries
                    && is_transient_error(&e)
                    && !is_permanent_error(&e)
                {
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        "Transient API error (attempt {}/{}): {e}. Retrying in {delay:?}...",
                        attempt + 1,
                        config.max_attempts(),
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                } else {
                    return Err(e);
                }
            }
        }
    }
}
