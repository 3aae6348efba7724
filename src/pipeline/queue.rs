use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("work queue closed, dispatcher is gone")]
pub struct QueueClosed;

/// Producer side of the raw file queue.
///
/// Cheap to clone; the scanner and any later submitter each hold one. The
/// channel is unbounded, so `submit` never waits and works from blocking
/// threads as well as async tasks. Backlog is bounded only by memory.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<PathBuf>,
}

// Consumer side, owned by the dispatcher
pub type WorkReceiver = mpsc::UnboundedReceiver<PathBuf>;

pub fn work_queue() -> (WorkQueue, WorkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (WorkQueue { tx }, rx)
}

impl WorkQueue {
    pub fn submit(&self, path: impl Into<PathBuf>) -> Result<(), QueueClosed> {
        self.tx.send(path.into()).map_err(|_| QueueClosed)?;
        metrics::counter!("mdingest_files_queued_total").increment(1);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_then_receive_in_order() {
        let (queue, mut rx) = work_queue();
        queue.submit("/data/us/AAPL/20230615.raw").unwrap();
        queue.submit("/data/us/MSFT/20230615.raw").unwrap();
        drop(queue);

        assert_eq!(rx.recv().await, Some(PathBuf::from("/data/us/AAPL/20230615.raw")));
        assert_eq!(rx.recv().await, Some(PathBuf::from("/data/us/MSFT/20230615.raw")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_submit_after_receiver_dropped() {
        let (queue, rx) = work_queue();
        drop(rx);
        assert!(queue.is_closed());
        assert_eq!(queue.submit("/data/us/AAPL/20230615.raw"), Err(QueueClosed));
    }

    #[test]
    fn test_submit_from_blocking_thread() {
        let (queue, mut rx) = work_queue();
        let producer = queue.clone();
        std::thread::spawn(move || {
            for day in 1..=3 {
                producer.submit(format!("/data/us/AAPL/2023060{}.raw", day)).unwrap();
            }
        })
        .join()
        .unwrap();
        drop(queue);

        let mut received = Vec::new();
        while let Ok(path) = rx.try_recv() {
            received.push(path);
        }
        assert_eq!(received.len(), 3);
    }
}
