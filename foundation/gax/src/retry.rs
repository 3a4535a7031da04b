use std::future::Future;
use std::iter::Take;
use std::time::Duration;

use tokio::select;

use crate::cancel::CancellationToken;
use crate::Cancelled;

/// An error a retry loop may decide to retry on.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current: u64,
    base: u64,
    factor: u64,
    max_delay: Option<Duration>,
}

impl ExponentialBackoff {
    pub fn from_millis(base: u64) -> ExponentialBackoff {
        ExponentialBackoff {
            current: base,
            base,
            factor: 1u64,
            max_delay: None,
        }
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        // set delay duration by applying factor
        let duration = if let Some(duration) = self.current.checked_mul(self.factor) {
            Duration::from_millis(duration)
        } else {
            Duration::from_millis(u64::MAX)
        };

        // check if we reached max delay
        if let Some(ref max_delay) = self.max_delay {
            if duration > *max_delay {
                return Some(*max_delay);
            }
        }

        if let Some(next) = self.current.checked_mul(self.base) {
            self.current = next;
        } else {
            self.current = u64::MAX;
        }

        Some(duration)
    }
}

#[derive(Clone, Debug)]
pub struct RetrySetting {
    pub from_millis: u64,
    pub max_delay: Option<Duration>,
    pub factor: u64,
    pub take: usize,
}

impl RetrySetting {
    fn strategy(&self) -> Take<ExponentialBackoff> {
        let mut st = ExponentialBackoff::from_millis(self.from_millis);
        st.max_delay = self.max_delay;
        st.factor = self.factor;
        st.take(self.take)
    }
}

impl Default for RetrySetting {
    fn default() -> Self {
        Self {
            from_millis: 500,
            max_delay: Some(Duration::from_secs(5)),
            factor: 2u64,
            take: 3,
        }
    }
}

/// Runs `action` until it succeeds, returns a non-retryable error, or the
/// backoff strategy is exhausted. Cancellation surfaces through the error's
/// `From<Cancelled>` conversion.
pub async fn invoke<R, E, A>(
    cancel: Option<CancellationToken>,
    retry: Option<RetrySetting>,
    mut action: impl FnMut() -> A,
) -> Result<R, E>
where
    E: Retryable + From<Cancelled>,
    A: Future<Output = Result<R, E>>,
{
    let fn_loop = async {
        let retry = retry.unwrap_or_default();
        let mut strategy = retry.strategy();
        loop {
            let error = match action().await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            if !error.is_retryable() {
                return Err(error);
            }
            match strategy.next() {
                None => return Err(error),
                Some(duration) => tokio::time::sleep(duration).await,
            };
        }
    };

    match cancel {
        Some(cancel) => {
            select! {
                _ = cancel.cancelled() => Err(Cancelled.into()),
                v = fn_loop => v
            }
        }
        None => fn_loop.await,
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
        Cancelled,
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    impl From<Cancelled> for TestError {
        fn from(_: Cancelled) -> Self {
            TestError::Cancelled
        }
    }

    fn fast_retry() -> RetrySetting {
        RetrySetting {
            from_millis: 1,
            max_delay: None,
            factor: 1,
            take: 3,
        }
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, TestError> = invoke(None, Some(fast_retry()), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TestError::Transient)
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, TestError> = invoke(None, Some(fast_retry()), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Fatal)
        })
        .await;
        assert_eq!(result.unwrap_err(), TestError::Fatal);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backoff_exhaustion_returns_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, TestError> = invoke(None, Some(fast_retry()), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Transient)
        })
        .await;
        assert_eq!(result.unwrap_err(), TestError::Transient);
        // initial attempt plus three backoff slots
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cancellation_converts() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<u32, TestError> = invoke(Some(token), Some(fast_retry()), || async {
            Err(TestError::Transient)
        })
        .await;
        assert_eq!(result.unwrap_err(), TestError::Cancelled);
    }
}
