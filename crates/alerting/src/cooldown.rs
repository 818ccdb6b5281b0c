//! Alert cooldown

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Monitored subject the alerts are about
    pub subject_id: i64,
    /// Minimum interval between two delivered alerts (seconds)
    pub cooldown_seconds: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            subject_id: 1,
            cooldown_seconds: 30,
        }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

/// Time of the last delivered alert. Starts as "never".
#[derive(Debug, Clone)]
pub struct AlertCooldown {
    duration: Duration,
    last_alert: Option<Instant>,
}

impl AlertCooldown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            last_alert: None,
        }
    }

    /// Time left before another alert may go out, or `None` when open
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_alert?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.duration {
            Some(self.duration - elapsed)
        } else {
            None
        }
    }

    /// Record a delivered alert
    pub fn record(&mut self, at: Instant) {
        debug!("Cooldown started ({}s)", self.duration.as_secs());
        self.last_alert = Some(at);
    }

    pub fn last_alert(&self) -> Option<Instant> {
        self.last_alert
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_never_alerted_is_open() {
        let cooldown = AlertCooldown::new(Duration::from_secs(30));
        assert_eq!(cooldown.remaining(Instant::now()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down_then_opens() {
        let mut cooldown = AlertCooldown::new(Duration::from_secs(30));
        cooldown.record(Instant::now());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cooldown.remaining(Instant::now()), Some(Duration::from_secs(20)));

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(cooldown.remaining(Instant::now()), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = AlertConfig::default();
        assert_eq!(config.cooldown(), Duration::from_secs(30));
        assert_eq!(config.subject_id, 1);
    }
}
