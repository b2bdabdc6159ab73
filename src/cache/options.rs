use std::time::Duration;

/// Upper bound for the retry backoff
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Freshness, retention and retry policy shared by every query key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
  /// How long a fetched value is served without refetching
  pub stale_after: Duration,
  /// How long an unobserved entry is kept before eviction
  pub retain_after: Duration,
  /// Extra attempts after a failed fetch
  pub retry_on_failure: u32,
  /// First backoff delay, doubled per attempt
  pub retry_delay: Duration,
  /// Refetch observed, stale entries when the terminal regains focus
  pub refetch_on_focus: bool,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      stale_after: Duration::from_secs(5 * 60),
      retain_after: Duration::from_secs(60 * 60),
      retry_on_failure: 3,
      retry_delay: Duration::from_secs(1),
      refetch_on_focus: true,
    }
  }
}

impl QueryOptions {
  /// Delay before retry number `attempt + 1`
  pub fn backoff(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    self
      .retry_delay
      .checked_mul(factor)
      .unwrap_or(MAX_RETRY_DELAY)
      .min(MAX_RETRY_DELAY)
  }
}
