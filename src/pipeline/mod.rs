// Raw file pipeline: scanner -> queue -> dispatcher -> processor tasks
pub mod dispatcher;  // admission control, one task per path
pub mod layout;      // path <-> (market, code, date), marker lookups
pub mod processor;   // per-file check, read, hand-off
pub mod queue;       // unbounded path channel
pub mod scanner;     // startup sweep for unprocessed files

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::decoder::RawDecoder;
use crate::market::MarketRegistry;
use dispatcher::Dispatcher;
use layout::RawLayout;
use processor::FileProcessor;
use queue::{work_queue, WorkQueue};
use scanner::{scan_in_background, ScanReport};

/// Maximum number of raw files processed at the same time.
pub const PARSE_CONCURRENCY: usize = 16;

/// One pipeline per process. Owns the queue and the dispatcher; nothing is
/// kept in globals.
pub struct Pipeline {
    layout: RawLayout,
    queue: WorkQueue,
    dispatcher: Dispatcher,
}

impl Pipeline {
    pub fn new(layout: RawLayout, registry: Arc<MarketRegistry>, decoder: Arc<dyn RawDecoder>) -> Self {
        if registry.is_empty() {
            warn!("market registry is empty, every raw file will fail to decode");
        }
        let (queue, rx) = work_queue();
        let processor = Arc::new(FileProcessor::new(layout.clone(), registry, decoder));
        let dispatcher = Dispatcher::new(rx, processor, PARSE_CONCURRENCY);
        Self { layout, queue, dispatcher }
    }

    // Handle for submitters other than the startup scan
    pub fn queue(&self) -> WorkQueue {
        self.queue.clone()
    }

    /// Start the dispatcher, then sweep the data root once.
    ///
    /// The dispatcher is spawned first so it is already receiving when the
    /// scan emits its first path.
    pub async fn start(self) -> RunningPipeline {
        let Pipeline { layout, queue, dispatcher } = self;
        let root = layout.root.clone();

        info!(root = %root.display(), ceiling = dispatcher.ceiling(), "starting raw file dispatcher");
        let inflight = dispatcher.inflight();
        let dispatcher = tokio::spawn(dispatcher.run());

        let scan = scan_in_background(layout, queue.clone()).await;
        if let Some(err) = &scan.first_error {
            warn!(root = %root.display(), error = %err, "error while searching for unprocessed raw files");
        }
        info!(root = %root.display(), count = scan.submitted, "found unprocessed raw files");

        RunningPipeline { queue, scan, inflight, dispatcher }
    }
}

pub struct RunningPipeline {
    queue: WorkQueue,
    pub scan: ScanReport,
    inflight: Arc<AtomicUsize>,
    dispatcher: JoinHandle<()>,
}

impl RunningPipeline {
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    /// Close this handle's side of the queue and wait for the dispatcher.
    /// Only returns once every other `WorkQueue` clone is dropped too.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        let RunningPipeline { queue, dispatcher, .. } = self;
        drop(queue);
        dispatcher.await
    }
}
