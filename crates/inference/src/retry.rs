use rand::Rng;
use refine_protocol::AnalysisConfig;
use std::time::Duration;

/// Exponential backoff with equal jitter for transient inference failures.
///
/// `delay_for(n)` is drawn from `[cap/2, cap]` where
/// `cap = min(base * 2^n, max_delay)`: half deterministic, half jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.min(16);
        let exp_ms = self.base_delay.as_millis().saturating_mul(1u128 << shift);
        let capped_ms = u64::try_from(exp_ms.min(self.max_delay.as_millis())).unwrap_or(u64::MAX);

        let half = capped_ms / 2;
        let jitter = if half == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=half)
        };
        Duration::from_millis(half + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}
