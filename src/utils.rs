use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Repeatedly runs `check` until it yields a value or `timeout` elapses
///
/// `check` runs at least once, then once per `interval`, and a final time at
/// the deadline. Returns `Ok(None)` when the deadline passed without a value;
/// an error from `check` ends the polling immediately. A timeout too large for
/// the clock never expires.
pub async fn poll_until<T, E, F>(
    interval: Duration,
    timeout: Duration,
    mut check: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Result<Option<T>, E>,
{
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if let Some(value) = check()? {
            return Ok(Some(value));
        }

        let wait = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                interval.min(deadline - now)
            }
            None => interval,
        };
        sleep(wait).await;
    }
}
