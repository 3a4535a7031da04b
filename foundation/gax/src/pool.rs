//! A fixed-size worker pool over one bounded channel.
//!
//! Dispatch and execution share the same bounded queue: `submit` applies
//! backpressure once every worker is busy and the queue is full, so the
//! number of pending tasks never grows past the pool size.

use std::future::Future;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::cancel::CancellationToken;

type Task<E> = BoxFuture<'static, Result<(), E>>;

pub struct WorkerPool<E> {
    tx: async_channel::Sender<Task<E>>,
    workers: Vec<JoinHandle<()>>,
    errors: Arc<Mutex<Vec<E>>>,
}

impl<E: Send + 'static> WorkerPool<E> {
    /// Spawns `size` workers draining one bounded channel. When `cancel`
    /// fires, intake closes: queued tasks still run, new submissions are
    /// dropped.
    pub fn new(size: usize, cancel: Option<CancellationToken>) -> Self {
        let size = size.max(1);
        let (tx, rx) = async_channel::bounded::<Task<E>>(size);
        let errors: Arc<Mutex<Vec<E>>> = Arc::new(Mutex::new(Vec::new()));

        if let Some(cancel) = cancel {
            let tx = tx.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                tx.close();
            });
        }

        let workers = (0..size)
            .map(|_| {
                let rx = rx.clone();
                let errors = Arc::clone(&errors);
                tokio::spawn(async move {
                    while let Ok(task) = rx.recv().await {
                        if let Err(e) = task.await {
                            errors.lock().unwrap().push(e);
                        }
                    }
                })
            })
            .collect();

        Self {
            tx,
            workers,
            errors,
        }
    }

    /// Submits a task, blocking while the queue is full. A task submitted
    /// after cancellation is silently dropped.
    pub async fn submit<F>(&self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let _ = self.tx.send(Box::pin(task)).await;
    }

    /// Closes intake, waits for every in-flight and queued task, and
    /// returns the collected task errors.
    pub async fn close_and_wait(self) -> Vec<E> {
        self.tx.close();
        for worker in self.workers {
            let _ = worker.await;
        }
        match Arc::try_unwrap(self.errors) {
            Ok(errors) => errors.into_inner().unwrap(),
            // unreachable once all workers joined
            Err(shared) => std::mem::take(&mut *shared.lock().unwrap()),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn runs_every_task_exactly_once() {
        let pool: WorkerPool<String> = WorkerPool::new(4, None);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let done = Arc::clone(&done);
            pool.submit(async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        }
        let errors = pool.close_and_wait().await;
        assert!(errors.is_empty());
        assert_eq!(done.load(Ordering::SeqCst), 100);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn aggregates_errors_without_stopping() {
        let pool: WorkerPool<String> = WorkerPool::new(2, None);
        let done = Arc::new(AtomicUsize::new(0));
        for i in 0..10 {
            let done = Arc::clone(&done);
            pool.submit(async move {
                if i % 3 == 0 {
                    Err(format!("task {i} failed"))
                } else {
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;
        }
        let mut errors = pool.close_and_wait().await;
        errors.sort();
        assert_eq!(errors.len(), 4);
        assert_eq!(done.load(Ordering::SeqCst), 6);
        assert!(errors[0].starts_with("task 0"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelled_pool_drops_new_submissions() {
        let cancel = CancellationToken::new();
        let pool: WorkerPool<String> = WorkerPool::new(2, Some(cancel.clone()));
        let done = Arc::new(AtomicUsize::new(0));
        {
            let done = Arc::clone(&done);
            pool.submit(async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        }
        cancel.cancel();
        // give the closer task a chance to run
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        {
            let done = Arc::clone(&done);
            pool.submit(async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        }
        let _ = pool.close_and_wait().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
