//! Bounded-retry policy with exponential backoff.
//!
//! Delays are computed by the policy and executed through a [`Sleeper`]
//! capability, so tests substitute an instant sleeper and assert the computed
//! schedule instead of waiting out real seconds.

use std::time::Duration;

use async_trait::async_trait;

/// Attempt budget plus the backoff base. After failed attempt `k` the delay
/// is `base_delay * 2^(k-1)`: 1, 2, 4, 8, ... time units.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub base_delay: Duration,
}

impl RetryPolicy {
  /// Delay to wait after `failed_attempt` (1-based) before the next try.
  pub fn delay_after(&self, failed_attempt: u32) -> Duration {
    let exp = failed_attempt.saturating_sub(1).min(16);
    self.base_delay.saturating_mul(1u32 << exp)
  }
}

/// Async sleep seam. The real implementation delegates to tokio.
#[async_trait]
pub trait Sleeper: Send + Sync {
  async fn sleep(&self, d: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
  async fn sleep(&self, d: Duration) {
    tokio::time::sleep(d).await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backoff_doubles_each_attempt() {
    let p = RetryPolicy { max_attempts: 5, base_delay: Duration::from_secs(1) };
    let secs: Vec<u64> = (1..=4).map(|a| p.delay_after(a).as_secs()).collect();
    assert_eq!(secs, vec![1, 2, 4, 8]);
  }

  #[test]
  fn backoff_exponent_is_capped() {
    let p = RetryPolicy { max_attempts: 64, base_delay: Duration::from_secs(1) };
    // Far past any realistic attempt budget; must not overflow.
    assert!(p.delay_after(60) >= p.delay_after(40));
  }
}
