//! On-disk layout of the data directory.
//!
//! Raw files live at `<root>/<market>/<code>/<YYYYMMDD><raw_suffix>`. Once a
//! decoder has finished with one it leaves a sibling marker with the same
//! base name and either the error or the regular suffix. Everything here is
//! path arithmetic except `is_settled`, which stats the two markers.

use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::market::{Market, MarketRegistry};

pub const DEFAULT_RAW_SUFFIX: &str = ".raw";
pub const DEFAULT_ERROR_SUFFIX: &str = ".error";
pub const DEFAULT_REGULAR_SUFFIX: &str = ".regular";

const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("malformed path: {}", .path.display())]
    MalformedPath { path: PathBuf },
    #[error("unknown market `{key}` in {}", .path.display())]
    UnknownMarket { key: String, path: PathBuf },
    #[error("malformed filename: {}", .path.display())]
    MalformedFilename { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Error,   // terminal failure
    Regular, // terminal success
}

// One unit of work, rebuilt from its path whenever it is needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFileRef {
    pub path: PathBuf,
    pub market: Market,
    pub code: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct RawLayout {
    pub root: PathBuf,
    pub raw_suffix: String,
    pub error_suffix: String,
    pub regular_suffix: String,
}

impl RawLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            raw_suffix: DEFAULT_RAW_SUFFIX.to_string(),
            error_suffix: DEFAULT_ERROR_SUFFIX.to_string(),
            regular_suffix: DEFAULT_REGULAR_SUFFIX.to_string(),
        }
    }

    pub fn with_suffixes(mut self, raw: &str, error: &str, regular: &str) -> Self {
        self.raw_suffix = raw.to_string();
        self.error_suffix = error.to_string();
        self.regular_suffix = regular.to_string();
        self
    }

    fn suffix(&self, kind: MarkerKind) -> &str {
        match kind {
            MarkerKind::Error => &self.error_suffix,
            MarkerKind::Regular => &self.regular_suffix,
        }
    }

    pub fn is_raw(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.ends_with(&self.raw_suffix))
    }

    /// Sibling marker for a raw file. Only the trailing raw suffix is
    /// replaced; a path without it just gets the marker suffix appended.
    pub fn marker_for(&self, raw: &Path, kind: MarkerKind) -> PathBuf {
        let name = raw.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let base = name.strip_suffix(self.raw_suffix.as_str()).unwrap_or(&name);
        raw.with_file_name(format!("{}{}", base, self.suffix(kind)))
    }

    // Marker location rebuilt from a decoded identity rather than a path
    pub fn marker_at(&self, market: &Market, code: &str, date: NaiveDate, kind: MarkerKind) -> PathBuf {
        self.root
            .join(&market.key)
            .join(code)
            .join(format!("{}{}", date.format(DATE_FORMAT), self.suffix(kind)))
    }

    /// True when either marker exists next to `raw`. Stat failures read as
    /// "absent"; nothing is locked, so two callers can both see `false`.
    pub fn is_settled(&self, raw: &Path) -> bool {
        self.marker_for(raw, MarkerKind::Error).exists()
            || self.marker_for(raw, MarkerKind::Regular).exists()
    }

    /// Map a raw file path to (market, code, date). Never touches the disk.
    pub fn decode(&self, path: &Path, registry: &MarketRegistry) -> Result<RawFileRef, PathError> {
        let malformed = || PathError::MalformedPath { path: path.to_path_buf() };

        let rest = path.strip_prefix(&self.root).map_err(|_| malformed())?;
        let mut parts = Vec::with_capacity(3);
        for component in rest.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str().ok_or_else(malformed)?),
                Component::RootDir | Component::CurDir => continue,
                _ => return Err(malformed()),
            }
        }
        let [key, code, file_name] = parts[..] else {
            return Err(malformed());
        };

        let market = registry.lookup(key).ok_or_else(|| PathError::UnknownMarket {
            key: key.to_string(),
            path: path.to_path_buf(),
        })?;

        let stem = file_name.strip_suffix(self.raw_suffix.as_str()).unwrap_or(file_name);
        let date = parse_date(stem).ok_or_else(|| PathError::MalformedFilename { path: path.to_path_buf() })?;

        Ok(RawFileRef {
            path: path.to_path_buf(),
            market: market.clone(),
            code: code.to_string(),
            date,
        })
    }
}

// Exactly eight ASCII digits, YYYYMMDD, and a real calendar day
fn parse_date(stem: &str) -> Option<NaiveDate> {
    if stem.len() != 8 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(stem, DATE_FORMAT).ok()
}
