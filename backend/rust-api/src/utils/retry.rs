use std::future::Future;
use std::time::Duration;

/// Backoff policy for idempotent store reads. Writes are never retried: a
/// repeated insert would record the same attempt twice.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(250),
            jitter_max: Some(Duration::from_millis(25)),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter_max: None,
        }
    }

    fn delay_for(&self, backoff: Duration) -> Duration {
        match self.jitter_max {
            Some(jitter_max) if !jitter_max.is_zero() => {
                let jitter_ms = jitter_max.as_millis() as u64;
                backoff + Duration::from_millis(rand::random::<u64>() % (jitter_ms + 1))
            }
            _ => backoff,
        }
    }
}

/// Runs `f` until it succeeds or the policy is exhausted, returning the last error.
pub async fn retry_read<F, Fut, T, E>(operation: &str, policy: &RetryPolicy, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempts_left = policy.max_attempts.max(1);
    let mut backoff = policy.base_backoff;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempts_left -= 1;
                if attempts_left == 0 {
                    return Err(err);
                }
                tracing::warn!(
                    "Store read '{}' failed, retrying ({} left): {}",
                    operation,
                    attempts_left,
                    err
                );
                tokio::time::sleep(policy.delay_for(backoff)).await;
                backoff = std::cmp::min(backoff * 2, policy.max_backoff);
            }
        }
    }
}
