//! The bounded polling primitive.
//!
//! Every wait in the engine (element appearance, publish verification, the
//! second-factor approval) is this one loop with an explicit interval and an
//! explicit maximum. Nothing in the engine blocks indefinitely.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, Instant};

/// Returned when a bounded wait expires without the probe succeeding.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("wait expired after {waited_ms} ms")]
pub struct WaitTimeout {
    pub waited_ms: u64,
}

/// Poll `probe` every `interval` until it yields a value, up to `max_wait`.
///
/// The probe is sampled once immediately, then on each interval. The final
/// sample lands on the deadline itself, so a condition that becomes true at
/// `max_wait` is still observed, and the error is returned at the deadline
/// rather than some interval past it.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    max_wait: Duration,
    mut probe: F,
) -> Result<T, WaitTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = Instant::now();
    loop {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        let elapsed = started.elapsed();
        if elapsed >= max_wait {
            return Err(WaitTimeout {
                waited_ms: elapsed.as_millis() as u64,
            });
        }
        let remaining = max_wait - elapsed;
        sleep(remaining.min(interval)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn returns_value_as_soon_as_probe_succeeds() {
        let mut samples = 0u32;
        let result = poll_until(
            Duration::from_millis(100),
            Duration::from_secs(5),
            || {
                samples += 1;
                let hit = samples >= 3;
                async move { hit.then_some("done") }
            },
        )
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(samples, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_on_the_deadline_not_after_it() {
        let started = Instant::now();
        let result: Result<(), _> = poll_until(
            Duration::from_millis(300),
            Duration::from_secs(2),
            || async { None },
        )
        .await;
        let elapsed = started.elapsed();
        assert!(result.is_err());
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(2) + Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_true_at_the_deadline_is_still_observed() {
        let deadline = Instant::now() + Duration::from_secs(1);
        let result = poll_until(
            Duration::from_millis(400),
            Duration::from_secs(1),
            || {
                let ready = Instant::now() >= deadline;
                async move { ready.then_some(()) }
            },
        )
        .await;
        assert_eq!(result, Ok(()));
    }
}
