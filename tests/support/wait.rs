//! Polling helpers for async tests.

use std::time::Duration;

/// Poll `condition` every 5ms until it holds, panicking after `timeout`.
pub async fn until<F>(timeout: Duration, what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let polled = tokio::time::timeout(timeout, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}

/// [`until`] with a two-second budget.
pub async fn eventually<F>(what: &str, condition: F)
where
    F: FnMut() -> bool,
{
    until(Duration::from_secs(2), what, condition).await;
}
