use rand::Rng;
use std::time::Duration;

/// Randomizes a retry delay so that many peers failing together do not retry
/// in lockstep.
pub fn jittered_backoff(rng: &mut impl Rng, backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }

    // "Equal jitter": delay is in [backoff/2, backoff].
    let half_ms = backoff_ms / 2;
    let jitter_ms = rng.gen_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

/// Doubles `backoff`, capped at `max`.
pub fn next_backoff(backoff: Duration, max: Duration) -> Duration {
    backoff.saturating_mul(2).min(max)
}
