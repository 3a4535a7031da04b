//! Bounded polling until a remote state machine reaches a terminal state.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::select;
use tokio::time::Instant;

use crate::cancel::CancellationToken;

static DEFAULT_POLL_INTERVAL_MS: AtomicU64 = AtomicU64::new(5_000);

/// The process-wide poll interval used when a `WaitConfig` does not pin one.
pub fn default_poll_interval() -> Duration {
    Duration::from_millis(DEFAULT_POLL_INTERVAL_MS.load(Ordering::Relaxed))
}

/// Test hook: overrides the process-wide poll interval.
pub fn set_default_poll_interval(interval: Duration) {
    DEFAULT_POLL_INTERVAL_MS.store(interval.as_millis() as u64, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl WaitConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// A config polling at the process-wide default interval.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            interval: default_poll_interval(),
            timeout,
        }
    }
}

/// One poll observation.
pub enum WaitDecision<T> {
    /// Terminal state reached.
    Done(T),
    /// Still converging; carries the observed state for the timeout message.
    Pending(String),
}

#[derive(thiserror::Error, Debug)]
pub enum WaitError<E> {
    #[error("timed out after {elapsed:?} waiting for convergence (last state: {last_state})")]
    Timeout {
        elapsed: Duration,
        last_state: String,
    },

    #[error("wait cancelled by caller")]
    Cancelled,

    #[error(transparent)]
    Poll(E),
}

/// Polls `poll` at `config.interval` until it reports a terminal state, the
/// timeout elapses, or the token is cancelled.
pub async fn wait_for<T, E, F, Fut>(
    cancel: Option<&CancellationToken>,
    config: WaitConfig,
    mut poll: F,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<WaitDecision<T>, E>>,
{
    let started = Instant::now();
    let deadline = started + config.timeout;
    let poll_loop = async {
        loop {
            let mut last_state = String::from("unknown");
            match poll().await {
                Ok(WaitDecision::Done(v)) => return Ok(v),
                Ok(WaitDecision::Pending(state)) => last_state = state,
                Err(e) => return Err(WaitError::Poll(e)),
            }
            if Instant::now() + config.interval > deadline {
                return Err(WaitError::Timeout {
                    elapsed: started.elapsed(),
                    last_state,
                });
            }
            tokio::time::sleep(config.interval).await;
        }
    };
    match cancel {
        Some(cancel) => {
            select! {
                _ = cancel.cancelled() => Err(WaitError::Cancelled),
                v = poll_loop => v
            }
        }
        None => poll_loop.await,
    }
}

/// Like [`wait_for`], but treats a not-found poll error as converged. Used
/// for waits that race resource deletion or asynchronous attachment.
pub async fn wait_for_or_gone<T, E, F, Fut, P>(
    cancel: Option<&CancellationToken>,
    config: WaitConfig,
    is_not_found: P,
    mut poll: F,
) -> Result<Option<T>, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<WaitDecision<T>, E>>,
    P: Fn(&E) -> bool,
{
    match wait_for(cancel, config, &mut poll).await {
        Ok(v) => Ok(Some(v)),
        Err(WaitError::Poll(e)) if is_not_found(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn fast() -> WaitConfig {
        WaitConfig::new(Duration::from_millis(1), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn reaches_terminal_state() {
        let polls = AtomicUsize::new(0);
        let out: Result<&str, WaitError<std::io::Error>> = wait_for(None, fast(), || async {
            if polls.fetch_add(1, Ordering::SeqCst) < 3 {
                Ok(WaitDecision::Pending("provisioning".into()))
            } else {
                Ok(WaitDecision::Done("ready"))
            }
        })
        .await;
        assert_eq!(out.unwrap(), "ready");
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn timeout_carries_last_state() {
        let cfg = WaitConfig::new(Duration::from_millis(5), Duration::from_millis(20));
        let out: Result<(), WaitError<std::io::Error>> = wait_for(None, cfg, || async {
            Ok(WaitDecision::Pending("stuck".into()))
        })
        .await;
        match out.unwrap_err() {
            WaitError::Timeout { last_state, .. } => assert_eq!(last_state, "stuck"),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let out: Result<(), WaitError<std::io::Error>> = wait_for(Some(&token), fast(), || async {
            Ok(WaitDecision::Pending("any".into()))
        })
        .await;
        assert!(matches!(out.unwrap_err(), WaitError::Cancelled));
    }

    #[tokio::test]
    async fn gone_is_converged() {
        let out: Result<Option<()>, WaitError<std::io::Error>> = wait_for_or_gone(
            None,
            fast(),
            |e: &std::io::Error| e.kind() == std::io::ErrorKind::NotFound,
            || async { Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")) },
        )
        .await;
        assert!(out.unwrap().is_none());
    }

    #[test]
    fn default_interval_override() {
        assert_eq!(default_poll_interval(), Duration::from_secs(5));
        set_default_poll_interval(Duration::from_millis(10));
        assert_eq!(default_poll_interval(), Duration::from_millis(10));
        set_default_poll_interval(Duration::from_secs(5));
    }
}
