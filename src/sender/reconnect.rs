use rand::Rng;
use std::time::Duration;

/// Backoff between connection attempts inside one post.
///
/// Attempt `n` waits `retry_wait * 1.5^n`, capped at `max_retry_wait`, with
/// ±50% jitter when enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub max_retry: u32,
    pub retry_wait: Duration,
    pub max_retry_wait: Duration,
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retry: 3,
            retry_wait: Duration::from_millis(500),
            max_retry_wait: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// No retries: one connection attempt per post.
    pub fn disabled() -> Self {
        Self {
            max_retry: 0,
            ..Self::default()
        }
    }

    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let factor = 1.5_f64.powi(attempt.min(64) as i32);
        let millis = self.retry_wait.as_millis() as f64 * factor;
        let capped = if millis >= self.max_retry_wait.as_millis() as f64 {
            self.max_retry_wait
        } else {
            Duration::from_millis(millis as u64)
        };

        if self.jitter {
            apply_jitter(capped)
        } else {
            capped
        }
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let jitter_factor = rng.random_range(0.5..1.5); // ±50% jitter
    let jittered_millis = (delay.as_millis() as f64 * jitter_factor) as u64;
    Duration::from_millis(jittered_millis)
}
