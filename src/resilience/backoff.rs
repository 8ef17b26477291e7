//! Exponential backoff with optional jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// capped at `max_ms`. Attempt 0 waits nothing.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    Duration::from_millis(delay_ms.min(max_ms))
}

/// Add up to `ratio * delay` of random extra wait.
pub fn apply_jitter(delay: Duration, ratio: f64) -> Duration {
    let jitter_range = (delay.as_millis() as f64 * ratio) as u64;
    if jitter_range == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);
        assert_eq!(calculate_backoff(1, 100, 2000), Duration::from_millis(100));
        assert_eq!(calculate_backoff(2, 100, 2000), Duration::from_millis(200));
        assert_eq!(calculate_backoff(3, 100, 2000), Duration::from_millis(400));
        assert_eq!(calculate_backoff(10, 100, 1000), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_saturates() {
        assert_eq!(calculate_backoff(200, u64::MAX / 2, u64::MAX), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_millis(1000);
        assert_eq!(apply_jitter(base, 0.0), base);
        for _ in 0..100 {
            let jittered = apply_jitter(base, 0.1);
            assert!(jittered >= base && jittered < Duration::from_millis(1100));
        }
    }
}
