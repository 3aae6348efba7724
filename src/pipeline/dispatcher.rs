use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::pipeline::processor::{FileProcessor, Outcome};
use crate::pipeline::queue::WorkReceiver;

/// Drains the work queue and runs one processing task per path, never more
/// than `ceiling` at a time.
///
/// The slot is taken *before* the task is spawned, so a saturated pool
/// stalls the receive loop and the backlog stays in the queue. Each task
/// owns its permit and gives it back when it ends, however it ends.
pub struct Dispatcher {
    rx: WorkReceiver,
    slots: Arc<Semaphore>,
    ceiling: usize,
    inflight: Arc<AtomicUsize>,
    processor: Arc<FileProcessor>,
}

// Keeps the in-flight count and gauge honest even if the task unwinds
struct InflightGuard {
    count: Arc<AtomicUsize>,
}

impl InflightGuard {
    fn enter(count: Arc<AtomicUsize>) -> Self {
        let now = count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::gauge!("mdingest_inflight").set(now as f64);
        Self { count }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        let now = self.count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::gauge!("mdingest_inflight").set(now as f64);
    }
}

impl Dispatcher {
    pub fn new(rx: WorkReceiver, processor: Arc<FileProcessor>, ceiling: usize) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            rx,
            slots: Arc::new(Semaphore::new(ceiling)),
            ceiling,
            inflight: Arc::new(AtomicUsize::new(0)),
            processor,
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    // Live count of processing tasks holding a slot
    pub fn inflight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.inflight)
    }

    // Returns once every WorkQueue handle is gone and in-flight work has finished
    pub async fn run(mut self) {
        while let Some(path) = self.rx.recv().await {
            let permit = match Arc::clone(&self.slots).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break, // semaphore closed, nothing more can run
            };

            let processor = Arc::clone(&self.processor);
            let inflight = Arc::clone(&self.inflight);
            tokio::spawn(async move {
                let _permit = permit;
                let _inflight = InflightGuard::enter(inflight);

                match processor.process(&path).await {
                    Ok(Outcome::Decoded) => {
                        metrics::counter!("mdingest_files_processed_total").increment(1);
                        debug!(path = %path.display(), "raw file processed");
                    }
                    Ok(Outcome::Skipped) => {
                        metrics::counter!("mdingest_files_skipped_total").increment(1);
                        debug!(path = %path.display(), "raw file already settled");
                    }
                    Err(err) => {
                        metrics::counter!("mdingest_files_failed_total").increment(1);
                        warn!(path = %path.display(), error = %err, "raw file processing failed");
                    }
                }
            });
        }

        // Wait for the stragglers by taking every slot back
        let _ = self.slots.acquire_many(self.ceiling as u32).await;
        info!("work queue closed, dispatcher drained");
    }
}
