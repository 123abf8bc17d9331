use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Point in time by which an operation must finish.
///
/// Created once per request and passed explicitly to every call that may
/// block on I/O. Running a future under an expired deadline drops it, which
/// cancels any query it had in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline exceeded")]
pub struct DeadlineExceeded;

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    pub async fn run<F, T>(self, future: F) -> Result<T, DeadlineExceeded>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout_at(self.at, future)
            .await
            .map_err(|_| DeadlineExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_future_finishing_in_time() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let value = deadline
            .run(async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                5
            })
            .await;
        assert_eq!(value, Ok(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_future_is_cut_off() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let value = deadline
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;

        assert_eq!(value, Err(DeadlineExceeded));
        assert!(Instant::now() >= deadline.at);
    }
}
