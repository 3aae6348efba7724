use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::decoder::RawDecoder;
use crate::market::MarketRegistry;
use crate::pipeline::layout::{PathError, RawLayout};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decoder failed for {}: {source:#}", .path.display())]
    Decoder {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Skipped, // a marker already exists
    Decoded,
}

/// Single pass over one raw file: marker re-check, path decode, read,
/// hand-off. Never retries and never writes markers.
pub struct FileProcessor {
    layout: RawLayout,
    registry: Arc<MarketRegistry>,
    decoder: Arc<dyn RawDecoder>,
}

impl FileProcessor {
    pub fn new(layout: RawLayout, registry: Arc<MarketRegistry>, decoder: Arc<dyn RawDecoder>) -> Self {
        Self { layout, registry, decoder }
    }

    pub async fn process(&self, path: &Path) -> Result<Outcome, ProcessError> {
        // The same path can be queued twice (scan + dynamic submit), check again
        if self.layout.is_settled(path) {
            return Ok(Outcome::Skipped);
        }

        let file = self.layout.decode(path, &self.registry)?;

        let raw = tokio::fs::read(path).await.map_err(|source| ProcessError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.decoder
            .decode(&file.market, &file.code, file.date, raw)
            .await
            .map_err(|source| ProcessError::Decoder { path: path.to_path_buf(), source })?;

        Ok(Outcome::Decoded)
    }
}
