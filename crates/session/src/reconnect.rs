//! Reconnect policy: jittered exponential back-off for failed connects.
//!
//! The back-off only applies to connect attempts that *fail*.  A transient
//! drop of a session that had opened reconnects immediately; the attempt
//! counter is reset by the supervisor once a connection opens.

use std::time::Duration;

use zd_domain::config::ReconnectConfig;

#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Consecutive failures before the supervisor parks the session in
    /// `Disconnected`.  `0` means retry forever.
    pub max_attempts: u32,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectBackoff {
    fn from(c: &ReconnectConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(c.initial_delay_ms),
            max_delay: Duration::from_millis(c.max_delay_ms),
            backoff_factor: c.backoff_factor,
            max_attempts: c.max_attempts,
        }
    }
}

impl ReconnectBackoff {
    /// Delay before retry number `attempt` (0-indexed), capped at
    /// `max_delay` plus up to 25% jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64;
        let exp = base * self.backoff_factor.powi(attempt as i32);
        let capped = exp.min(self.max_delay.as_millis() as f64);
        let jittered = capped * (1.0 + 0.25 * jitter_fraction(attempt));
        Duration::from_millis(jittered as u64)
    }

    /// Whether `attempt` consecutive failures exhaust the policy.
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

/// Deterministic fraction in `[0, 1)` derived from the attempt number.
/// Just enough spread to avoid synchronized reconnect storms.
fn jitter_fraction(attempt: u32) -> f64 {
    let h = attempt.wrapping_add(1).wrapping_mul(2_654_435_761);
    f64::from(h as u32 >> 8) / f64::from(1u32 << 24)
}
