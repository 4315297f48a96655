// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential reconnect backoff with jitter.

use std::time::Duration;

use walink_config::model::ConnectionConfig;

/// `delay(n) = min(initial * multiplier^n, max)`, shortened by up to `jitter`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
}

impl ReconnectPolicy {
    pub fn new(initial: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            initial,
            max: max.max(initial),
            multiplier: multiplier.max(1.0),
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(
            Duration::from_millis(config.reconnect_initial_ms),
            Duration::from_millis(config.reconnect_max_ms),
            config.reconnect_multiplier,
            config.reconnect_jitter,
        )
    }

    /// Capped delay before jitter for the `attempt`-th consecutive failure (0-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial.as_secs_f64() * self.multiplier.powi(exp);
        if !scaled.is_finite() || scaled >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// Delay for `attempt` given a uniform sample in `[0, 1)`.
    pub fn delay_with(&self, attempt: u32, sample: f64) -> Duration {
        let factor = 1.0 - self.jitter * sample.clamp(0.0, 1.0);
        self.base_delay(attempt).mul_f64(factor)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, rand::random::<f64>())
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ConnectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            2.0,
            0.2,
        )
    }

    #[test]
    fn delay_doubles_until_cap() {
        let p = policy();
        assert_eq!(p.base_delay(0), Duration::from_secs(1));
        assert_eq!(p.base_delay(1), Duration::from_secs(2));
        assert_eq!(p.base_delay(5), Duration::from_secs(32));
        assert_eq!(p.base_delay(6), Duration::from_secs(60));
        assert_eq!(p.base_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn jitter_only_shortens() {
        let p = policy();
        assert_eq!(p.delay_with(3, 0.0), Duration::from_secs(8));
        let shortest = p.delay_with(3, 1.0).as_secs_f64();
        assert!((shortest - 6.4).abs() < 1e-9, "{shortest}");
        for _ in 0..100 {
            let d = p.delay(2);
            assert!(d <= Duration::from_secs(4));
            assert!(d.as_secs_f64() >= 3.2 - 1e-9);
        }
    }

    #[test]
    fn bad_parameters_are_clamped() {
        let p = ReconnectPolicy::new(Duration::from_secs(5), Duration::from_secs(1), 0.5, 3.0);
        assert_eq!(p.base_delay(0), Duration::from_secs(5));
        assert_eq!(p.base_delay(4), Duration::from_secs(5));
        assert_eq!(p.delay_with(0, 1.0), Duration::ZERO);
    }

    #[test]
    fn defaults_match_config_defaults() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.base_delay(0), Duration::from_secs(1));
        assert_eq!(p.base_delay(10), Duration::from_secs(60));
    }
}
