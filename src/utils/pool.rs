use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bounded pool for CPU-bound work: at most `max_workers` closures run at once,
/// each on tokio's blocking thread pool.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        WorkerPool {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Applies `work` to every item and returns the results in input order,
    /// regardless of completion order.
    pub async fn map_ordered<T, R, F>(&self, items: Vec<T>, work: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let semaphore = self.semaphore.clone();
                let work = work.clone();
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await?;
                    let result = tokio::task::spawn_blocking(move || work(item)).await?;
                    Ok::<R, anyhow::Error>(result)
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for joined in join_all(handles).await {
            results.push(joined??);
        }
        Ok(results)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        )
    }
}
