use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub size: usize,
    pub busy: usize,
    pub completed: u64,
}

/// Bounded execution pool: at most `size` jobs run at once, the rest wait.
#[derive(Debug, Clone)]
pub struct ExecutorPool {
    permits: Arc<Semaphore>,
    size: usize,
    completed: Arc<AtomicU64>,
}

impl ExecutorPool {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
            completed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn run<F, T>(&self, job: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquisition only waits.
        let _permit = self.permits.acquire().await.ok();
        let out = job.await;
        self.completed.fetch_add(1, Ordering::Relaxed);
        out
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.size,
            busy: self.size - self.permits.available_permits(),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }
}
