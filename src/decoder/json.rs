//! Reference decoder used by the binary.
//!
//! Treats each raw file as a JSON document. A parsable payload is
//! re-serialized into the regular marker; anything else leaves the error
//! text in the error marker. Either marker stops the file from being
//! picked up again on the next start.

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use super::RawDecoder;
use crate::market::Market;
use crate::pipeline::layout::{MarkerKind, RawLayout};

pub struct JsonFileDecoder {
    layout: RawLayout,
}

impl JsonFileDecoder {
    pub fn new(layout: RawLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl RawDecoder for JsonFileDecoder {
    async fn decode(&self, market: &Market, code: &str, date: NaiveDate, raw: Vec<u8>) -> anyhow::Result<()> {
        match serde_json::from_slice::<serde_json::Value>(&raw) {
            Ok(doc) => {
                let marker = self.layout.marker_at(market, code, date, MarkerKind::Regular);
                let body = serde_json::to_vec(&doc)?;
                tokio::fs::write(&marker, body)
                    .await
                    .with_context(|| format!("writing {}", marker.display()))?;
                debug!(market = %market.key, code, %date, "payload accepted");
                Ok(())
            }
            Err(parse_err) => {
                let marker = self.layout.marker_at(market, code, date, MarkerKind::Error);
                tokio::fs::write(&marker, parse_err.to_string())
                    .await
                    .with_context(|| format!("writing {}", marker.display()))?;
                Err(anyhow::Error::new(parse_err)
                    .context(format!("payload for {} {} {} is not JSON", market.key, code, date)))
            }
        }
    }
}
