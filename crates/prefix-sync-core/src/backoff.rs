//! Conflict backoff: `attempt⁴ + 15 + random(0, 10 × (attempt + 1))` milliseconds.
//!
//! The polynomial base raises the minimum wait with every retry; the jitter
//! spreads out invocations that collided on the same list version.

use std::time::Duration;

use rand::Rng;

/// Constant added to every wait (milliseconds).
pub const BASE_WAIT_MS: u64 = 15;

/// Deterministic lower bound for `attempt`, in milliseconds.
pub fn floor_ms(attempt: u32) -> u64 {
    u64::from(attempt)
        .saturating_pow(4)
        .saturating_add(BASE_WAIT_MS)
}

/// Upper bound (exclusive) of the jitter term for `attempt`, in milliseconds.
pub fn jitter_span_ms(attempt: u32) -> u64 {
    10 * (u64::from(attempt) + 1)
}

/// Wait before retry number `attempt` (1 for the first retry).
pub fn wait(attempt: u32) -> Duration {
    wait_with(attempt, &mut rand::thread_rng())
}

/// [`wait`] with a caller-supplied random source.
pub fn wait_with<R: Rng + ?Sized>(attempt: u32, rng: &mut R) -> Duration {
    let jitter = rng.gen_range(0..jitter_span_ms(attempt));
    Duration::from_millis(floor_ms(attempt).saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn wait_never_drops_below_floor() {
        for attempt in 1..=12 {
            for _ in 0..50 {
                let ms = wait(attempt).as_millis() as u64;
                assert!(ms >= floor_ms(attempt), "attempt {attempt}: {ms}ms");
                assert!(ms < floor_ms(attempt) + jitter_span_ms(attempt));
            }
        }
    }

    #[test]
    fn floor_values() {
        assert_eq!(floor_ms(1), 16);
        assert_eq!(floor_ms(2), 31);
        assert_eq!(floor_ms(3), 96);
        assert_eq!(floor_ms(5), 640);
    }

    #[test]
    fn floor_is_strictly_increasing() {
        let floors: Vec<u64> = (1..=10).map(floor_ms).collect();
        assert!(floors.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn zero_rng_yields_floor() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(wait_with(2, &mut rng), Duration::from_millis(31));
    }

    #[test]
    fn huge_attempts_saturate() {
        assert_eq!(floor_ms(u32::MAX), u64::MAX);
        let _ = wait(u32::MAX);
    }
}
