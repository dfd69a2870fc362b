#![allow(dead_code)]

pub mod builders;
pub mod collaborators;
pub mod mock_telescope;
pub mod strategies;

pub use builders::*;
pub use collaborators::*;
pub use mock_telescope::*;

use std::future::Future;
use std::time::Duration;

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    condition()
}

/// Fail the test if `fut` does not finish within `timeout`.
pub async fn within<T>(timeout: Duration, fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(timeout, fut)
        .await
        .expect("operation did not finish in time")
}
