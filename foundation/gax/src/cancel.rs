use tokio_util::sync::CancellationToken as InternalCancellationToken;

/// Cancellation handle threaded from the orchestrator into every API call,
/// waiter and worker pool. Wraps tokio_util so the service crates never
/// depend on it directly.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: InternalCancellationToken,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token; every clone observes it.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn clones_share_the_signal() {
        let token = CancellationToken::new();
        let clone = token.clone();
        let waiter = tokio::spawn(async move { clone.cancelled().await });
        token.cancel();
        waiter.await.unwrap();
    }
}
