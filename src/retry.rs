use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry/timeout policy for read paths: historical event fetches and
/// balance loads. User transactions are never retried automatically.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub initial_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout: Duration::from_secs(30),
            initial_delay: Duration::from_millis(100),
        }
    }
}

impl FetchPolicy {
    pub fn new(attempts: u32, timeout_secs: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            timeout: Duration::from_secs(timeout_secs),
            ..Default::default()
        }
    }

    /// Run `operation` until it succeeds or the attempt budget runs out.
    /// Each attempt is bounded by the policy timeout, so a hung provider
    /// call degrades instead of stalling the caller forever.
    pub async fn run<F, Fut, T, E>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        let mut delay = self.initial_delay;

        loop {
            attempt += 1;
            match tokio::time::timeout(self.timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    if attempt >= self.attempts {
                        return Err(anyhow::anyhow!(
                            "{} failed after {} attempts: {}",
                            operation_name,
                            attempt,
                            e
                        ));
                    }
                    warn!(
                        "{} attempt {}/{} failed: {}. Retrying in {:?}",
                        operation_name, attempt, self.attempts, e, delay
                    );
                }
                Err(_) => {
                    if attempt >= self.attempts {
                        return Err(anyhow::anyhow!(
                            "{} timed out after {} attempts",
                            operation_name,
                            attempt
                        ));
                    }
                    warn!(
                        "{} attempt {}/{} timed out after {:?}. Retrying in {:?}",
                        operation_name, attempt, self.attempts, self.timeout, delay
                    );
                }
            }

            tokio::time::sleep(delay).await;
            delay = std::cmp::min(delay * 2, Duration::from_secs(5));
        }
    }
}
