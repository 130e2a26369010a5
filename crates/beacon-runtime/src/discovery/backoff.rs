use std::future::Future;
use std::time::Duration;

use beacon_core::error::Result;

/// Fixed-interval backoff with a bounded number of attempts.
///
/// Yields `interval` for the first `attempts - 1` queries, then `None`.
/// Returning `None` resets the counter so the same policy can drive a
/// later, independent retry sequence.
#[derive(Debug, Clone)]
pub struct MaxAttemptBackoff {
    interval: Duration,
    attempts: u32,
    count: u32,
}

impl MaxAttemptBackoff {
    /// Create a new policy.
    pub fn new(interval: Duration, attempts: u32) -> Self {
        Self {
            interval,
            attempts,
            count: 0,
        }
    }

    /// Retries handed out since the last reset.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Reset the attempt counter.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Delay before the next attempt, or `None` to stop.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.count + 1 >= self.attempts {
            self.reset();
            return None;
        }
        self.count += 1;
        Some(self.interval)
    }
}

/// Run `op` until it succeeds or the policy says stop.
///
/// `notify` sees every failure that will be retried, with the delay about
/// to be slept. The last error is returned when attempts run out.
pub async fn retry_notify<T, F, Fut, N>(
    backoff: &mut MaxAttemptBackoff,
    mut op: F,
    mut notify: N,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    N: FnMut(&beacon_core::BeaconError, Duration),
{
    backoff.reset();

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match backoff.next_backoff() {
            Some(delay) => {
                notify(&err, delay);
                tokio::time::sleep(delay).await;
            }
            None => return Err(err),
        }
    }
}
