//! Reconnect backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Delay before reconnect attempt `attempt` (1-based).
///
/// Doubles from `base_ms` per attempt, capped at `max_ms`, plus up to 10%
/// jitter so nodes that dropped together do not reconnect in lockstep.
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_cap() {
        assert_eq!(backoff_delay(0, 100, 2000), Duration::ZERO);

        let first = backoff_delay(1, 100, 2000).as_millis();
        assert!((100..110).contains(&first));

        let third = backoff_delay(3, 100, 2000).as_millis();
        assert!((400..440).contains(&third));

        let capped = backoff_delay(30, 100, 1000).as_millis();
        assert!((1000..1100).contains(&capped));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let d = backoff_delay(u32::MAX, u64::MAX, 5000);
        assert!(d.as_millis() >= 5000);
    }
}
