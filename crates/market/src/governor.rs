use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing::warn;

/// Bounded-retry settings for calls to the external pricing service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 2, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { remaining: u32 },
    Blocked { reason: String },
}

/// Hard per-process budget over calls to the external paid service. Shared
/// by handle across all negotiations; the counter only ever goes up — a
/// reserved slot is consumed even if the call behind it fails.
pub struct RequestGovernor {
    budget: u32,
    used: AtomicU32,
    retry: RetryPolicy,
}

impl RequestGovernor {
    pub fn new(budget: u32, retry: RetryPolicy) -> Self {
        Self { budget, used: AtomicU32::new(0), retry }
    }

    pub fn can_request(&self) -> QuotaDecision {
        let used = self.used.load(Ordering::SeqCst);
        if used < self.budget {
            QuotaDecision::Allowed { remaining: self.budget - used }
        } else {
            QuotaDecision::Blocked {
                reason: format!("request budget of {} exhausted for this session", self.budget),
            }
        }
    }

    /// Atomic check-and-increment. Returns false once the budget is spent.
    pub fn reserve(&self) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < self.budget).then_some(used + 1)
            })
            .is_ok()
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    /// Run `operation` with bounded retries and exponential backoff. The
    /// final error is returned to the caller, who is expected to take a
    /// fallback path rather than propagate it into the negotiation flow.
    pub async fn execute_with_retry<T, E, F, Fut>(&self, label: &str, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        warn!(
                            label,
                            attempt,
                            error = %error,
                            "external call failed; retries exhausted"
                        );
                        return Err(error);
                    }

                    warn!(label, attempt, error = %error, "external call failed; retrying");
                    let delay = self.retry.backoff(attempt - 1);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
