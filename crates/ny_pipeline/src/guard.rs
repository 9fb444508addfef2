use std::future::Future;
use std::time::Duration;

use ny_core::{Error, Result};
use tokio_util::sync::CancellationToken;

/// Wraps every external call of a run with cooperative cancellation and an
/// optional per-call timeout.
#[derive(Debug, Clone)]
pub struct CallGuard {
    token: CancellationToken,
    timeout: Option<Duration>,
}

impl CallGuard {
    pub fn new(token: CancellationToken, timeout: Option<Duration>) -> Self {
        Self { token, timeout }
    }

    /// Guard sharing this one's timeout, cancelled with it or on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            timeout: self.timeout,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn run<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or_else(|_| Err(Error::Timeout(limit))),
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_result_through() {
        let guard = CallGuard::new(CancellationToken::new(), Some(Duration::from_secs(5)));
        assert_eq!(guard.run(async { Ok(42) }).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let guard = CallGuard::new(CancellationToken::new(), None);
        guard.cancel();
        let mut called = false;
        let result = guard
            .run(async {
                called = true;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(!called);
    }

    #[tokio::test]
    async fn test_cancelled_during_call() {
        let token = CancellationToken::new();
        let guard = CallGuard::new(token.clone(), None);
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let result: Result<()> = guard
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        canceller.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let guard = CallGuard::new(CancellationToken::new(), Some(Duration::from_secs(2)));
        let result: Result<()> = guard
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::Timeout(d)) if d == Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_child_cancellation_does_not_reach_parent() {
        let parent = CallGuard::new(CancellationToken::new(), None);
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        parent.cancel();
        assert!(parent.child().is_cancelled());
    }
}
