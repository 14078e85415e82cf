//! Per-session flood limiter: a token bucket that also tracks debt.
//!
//! - Tokens refill at one per `interval` seconds, capped at `burst`.
//! - A command that finds enough tokens is allowed and clears all debt.
//! - A command that does not is rejected and its cost is added to the debt;
//!   once debt reaches `excess_threshold` the caller disconnects the client.
//!
//! Bursts up to `burst` are free, and a client that backs off for a moment is
//! forgiven completely. Only uninterrupted flooding reaches the threshold.

use std::time::Instant;

/// Outcome of [`FloodLimiter::try_consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodVerdict {
    /// Run the command.
    Allowed,
    /// Drop the command silently.
    Throttled,
    /// Debt crossed the threshold; disconnect.
    ExcessFlood,
}

/// Token bucket with debt.
#[derive(Debug, Clone)]
pub struct FloodLimiter {
    burst: f64,
    interval: f64,
    excess_threshold: u32,
    tokens: f64,
    last_update: Instant,
    debt: u32,
}

impl FloodLimiter {
    /// Create a full bucket.
    ///
    /// `burst` and `excess_threshold` are clamped to at least 1 and a
    /// non-positive `interval_secs` is treated as one second.
    pub fn new(burst: u32, interval_secs: f64, excess_threshold: u32) -> Self {
        Self::new_at(burst, interval_secs, excess_threshold, Instant::now())
    }

    /// Create a full bucket whose clock starts at `now`.
    pub fn new_at(burst: u32, interval_secs: f64, excess_threshold: u32, now: Instant) -> Self {
        let burst = f64::from(burst.max(1));
        let interval = if interval_secs.is_finite() && interval_secs > 0.0 {
            interval_secs
        } else {
            1.0
        };
        Self {
            burst,
            interval,
            excess_threshold: excess_threshold.max(1),
            tokens: burst,
            last_update: now,
            debt: 0,
        }
    }

    /// Consume `cost` tokens now.
    pub fn try_consume(&mut self, cost: u32) -> FloodVerdict {
        self.try_consume_at(Instant::now(), cost)
    }

    /// Consume `cost` tokens at `now`. Times earlier than the last update
    /// refill nothing.
    pub fn try_consume_at(&mut self, now: Instant, cost: u32) -> FloodVerdict {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed / self.interval).min(self.burst);
        if now > self.last_update {
            self.last_update = now;
        }

        let cost_f = f64::from(cost);
        if self.tokens >= cost_f {
            self.tokens -= cost_f;
            self.debt = 0;
            return FloodVerdict::Allowed;
        }

        self.debt = self.debt.saturating_add(cost);
        if self.debt >= self.excess_threshold {
            FloodVerdict::ExcessFlood
        } else {
            FloodVerdict::Throttled
        }
    }

    /// Tokens currently held (as of the last update).
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Accumulated rejected cost.
    pub fn debt(&self) -> u32 {
        self.debt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_burst_then_throttle() {
        let t0 = Instant::now();
        let mut limiter = FloodLimiter::new_at(5, 2.0, 20, t0);
        for _ in 0..5 {
            assert_eq!(limiter.try_consume_at(t0, 1), FloodVerdict::Allowed);
        }
        assert_eq!(limiter.try_consume_at(t0, 1), FloodVerdict::Throttled);
    }

    #[test]
    fn test_debt_accumulates_to_excess_flood() {
        let t0 = Instant::now();
        let mut limiter = FloodLimiter::new_at(1, 10.0, 5, t0);
        assert_eq!(limiter.try_consume_at(t0, 1), FloodVerdict::Allowed);
        for expected_debt in 1..=4 {
            assert_eq!(limiter.try_consume_at(t0, 1), FloodVerdict::Throttled);
            assert_eq!(limiter.debt(), expected_debt);
        }
        assert_eq!(limiter.try_consume_at(t0, 1), FloodVerdict::ExcessFlood);
        assert_eq!(limiter.debt(), 5);
    }

    #[test]
    fn test_allowed_clears_debt() {
        let t0 = Instant::now();
        let mut limiter = FloodLimiter::new_at(1, 1.0, 100, t0);
        assert_eq!(limiter.try_consume_at(t0, 1), FloodVerdict::Allowed);
        assert_eq!(limiter.try_consume_at(t0, 1), FloodVerdict::Throttled);
        assert_eq!(limiter.try_consume_at(t0, 1), FloodVerdict::Throttled);
        assert_eq!(limiter.debt(), 2);

        let later = t0 + Duration::from_secs(1);
        assert_eq!(limiter.try_consume_at(later, 1), FloodVerdict::Allowed);
        assert_eq!(limiter.debt(), 0);
    }

    #[test]
    fn test_tokens_never_exceed_burst() {
        let t0 = Instant::now();
        let mut limiter = FloodLimiter::new_at(3, 0.5, 10, t0);
        let much_later = t0 + Duration::from_secs(86_400);
        assert_eq!(limiter.try_consume_at(much_later, 0), FloodVerdict::Allowed);
        assert!(limiter.tokens() <= 3.0);
        for _ in 0..3 {
            assert_eq!(limiter.try_consume_at(much_later, 1), FloodVerdict::Allowed);
        }
        assert_eq!(limiter.try_consume_at(much_later, 1), FloodVerdict::Throttled);
    }

    #[test]
    fn test_refill_is_proportional_to_interval() {
        let t0 = Instant::now();
        let mut limiter = FloodLimiter::new_at(2, 2.0, 10, t0);
        limiter.try_consume_at(t0, 2);
        assert_eq!(limiter.try_consume_at(t0 + Duration::from_secs(1), 1), FloodVerdict::Throttled);
        assert_eq!(limiter.try_consume_at(t0 + Duration::from_secs(2), 1), FloodVerdict::Allowed);
    }

    #[test]
    fn test_rejected_cost_leaves_tokens_untouched() {
        let t0 = Instant::now();
        let mut limiter = FloodLimiter::new_at(2, 10.0, 10, t0);
        assert_eq!(limiter.try_consume_at(t0, 3), FloodVerdict::Throttled);
        assert_eq!(limiter.tokens(), 2.0);
        assert_eq!(limiter.debt(), 3);
    }

    #[test]
    fn test_clock_going_backwards_refills_nothing() {
        let t0 = Instant::now() + Duration::from_secs(5);
        let mut limiter = FloodLimiter::new_at(1, 1.0, 10, t0);
        limiter.try_consume_at(t0, 1);
        assert_eq!(
            limiter.try_consume_at(t0 - Duration::from_secs(3), 1),
            FloodVerdict::Throttled
        );
    }
}
