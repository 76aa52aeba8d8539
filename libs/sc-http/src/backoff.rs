use rand::Rng;
use std::time::Duration;

/// Exponential backoff configuration
///
/// Computes delay as: `min(initial * multiplier^attempt, max)` with optional jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    /// Initial backoff duration (default: 1s)
    pub initial: Duration,

    /// Maximum backoff duration (default: 30s)
    pub max: Duration,

    /// Backoff multiplier for exponential growth (default: 2.0)
    pub multiplier: f64,

    /// Adds a random 0-25% on top of each delay when enabled (default: true)
    pub jitter: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl ExponentialBackoff {
    /// Fast backoff for tests (1ms initial, 100ms max, no jitter)
    #[must_use]
    pub fn fast() -> Self {
        Self {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

/// Delay policy between retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed(Duration),
    /// Growing delay, see [`ExponentialBackoff`]
    Exponential(ExponentialBackoff),
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential(ExponentialBackoff::default())
    }
}

impl Backoff {
    /// Delay to wait before retry number `attempt` (0-based).
    #[must_use]
    pub fn delay(&self, attempt: usize) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential(backoff) => calculate_backoff(backoff, attempt),
        }
    }
}

fn calculate_backoff(backoff: &ExponentialBackoff, attempt: usize) -> Duration {
    // One day is far beyond any sane retry delay
    const MAX_BACKOFF_SECS: f64 = 86400.0;

    let attempt_i32 = i32::try_from(attempt).unwrap_or(i32::MAX);

    let multiplier = if backoff.multiplier.is_finite() && backoff.multiplier >= 0.0 {
        backoff.multiplier
    } else {
        1.0
    };

    let initial_secs = backoff.initial.as_secs_f64();
    let max_secs = backoff.max.as_secs_f64().min(MAX_BACKOFF_SECS);

    let base = initial_secs * multiplier.powi(attempt_i32);
    let clamped = if base.is_finite() {
        base.min(max_secs).max(0.0)
    } else {
        max_secs
    };
    let duration = Duration::from_secs_f64(clamped);

    let duration = if backoff.jitter {
        let jitter_factor = rand::rng().random_range(0.0..=0.25);
        duration + duration.mul_f64(jitter_factor)
    } else {
        duration
    };

    duration.min(Duration::from_secs_f64(max_secs))
}
