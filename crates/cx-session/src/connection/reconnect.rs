//! Fixed-delay reconnection

use std::time::Duration;

use cx_core::config::ClientConfig;

/// Shortest accepted delay; anything below would spin on a dead backend
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Longest accepted delay, so the next deadline always fits in an `Instant`
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Reconnects after a constant delay with no upper bound on attempts
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delay: Duration,
    /// Consecutive failed attempts since the last successful open
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.reconnect_delay)
    }

    /// Delays outside `MIN_RECONNECT_DELAY..=MAX_RECONNECT_DELAY` are clamped
    pub fn new(delay: Duration) -> Self {
        let clamped = delay.clamp(MIN_RECONNECT_DELAY, MAX_RECONNECT_DELAY);
        if clamped != delay {
            tracing::warn!("Reconnect delay {:?} out of range, using {:?}", delay, clamped);
        }
        Self {
            delay: clamped,
            attempts: 0,
        }
    }

    /// Delay before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        self.delay
    }

    /// The socket opened
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_is_constant() {
        let mut policy = ReconnectPolicy::new(Duration::from_secs(3));

        for _ in 0..50 {
            assert_eq!(policy.next_delay(), Duration::from_secs(3));
        }
        assert_eq!(policy.attempts(), 50);
    }

    #[test]
    fn test_out_of_range_delay_is_clamped() {
        let config = ClientConfig {
            reconnect_delay: Duration::from_secs_f64(1e19),
            ..Default::default()
        };
        let mut policy = ReconnectPolicy::from_config(&config);
        let delay = policy.next_delay();
        assert_eq!(delay, MAX_RECONNECT_DELAY);
        assert!(tokio::time::Instant::now().checked_add(delay).is_some());

        let mut policy = ReconnectPolicy::new(Duration::ZERO);
        assert_eq!(policy.next_delay(), MIN_RECONNECT_DELAY);
    }

    #[test]
    fn test_reset_clears_attempts() {
        let mut policy = ReconnectPolicy::from_config(&ClientConfig::default());
        policy.next_delay();
        policy.next_delay();
        policy.reset();

        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.next_delay(), Duration::from_secs(3));
    }
}
