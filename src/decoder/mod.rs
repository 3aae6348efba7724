// Seam between the pipeline and whatever understands the payload bytes
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::market::Market;

#[async_trait]
pub trait RawDecoder: Send + Sync {
    // Called once per eligible raw file. The error is logged, never inspected.
    async fn decode(&self, market: &Market, code: &str, date: NaiveDate, raw: Vec<u8>) -> anyhow::Result<()>;
}

pub mod json;
