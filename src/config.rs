use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::market::{Market, MarketRegistry};
use crate::pipeline::layout::{RawLayout, DEFAULT_ERROR_SUFFIX, DEFAULT_RAW_SUFFIX, DEFAULT_REGULAR_SUFFIX};

const ENV_PREFIX: &str = "MDINGEST";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    #[serde(default = "default_raw_suffix")]
    pub raw_suffix: String,
    #[serde(default = "default_error_suffix")]
    pub error_suffix: String,
    #[serde(default = "default_regular_suffix")]
    pub regular_suffix: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    // A list of { key, name } tables: `config` lowercases table keys, values keep their case
    #[serde(default = "default_markets")]
    pub markets: Vec<Market>,
}

fn default_raw_suffix() -> String {
    DEFAULT_RAW_SUFFIX.to_string()
}

fn default_error_suffix() -> String {
    DEFAULT_ERROR_SUFFIX.to_string()
}

fn default_regular_suffix() -> String {
    DEFAULT_REGULAR_SUFFIX.to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_markets() -> Vec<Market> {
    vec![
        Market::new("us", "United States"),
        Market::new("cn", "China"),
        Market::new("hk", "Hong Kong"),
    ]
}

impl Settings {
    /// Optional TOML file first, then `MDINGEST_*` environment variables
    /// for the scalar keys, e.g. `MDINGEST_RAW_SUFFIX=.dat`.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().set_default("data_dir", "data")?;
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("_"))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let suffixes = [&self.raw_suffix, &self.error_suffix, &self.regular_suffix];
        if suffixes.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Message("file suffixes must not be empty".into()));
        }
        if self.raw_suffix == self.error_suffix
            || self.raw_suffix == self.regular_suffix
            || self.error_suffix == self.regular_suffix
        {
            return Err(ConfigError::Message(format!(
                "file suffixes must be distinct, got raw={} error={} regular={}",
                self.raw_suffix, self.error_suffix, self.regular_suffix
            )));
        }
        if self.markets.is_empty() {
            return Err(ConfigError::Message("at least one market must be configured".into()));
        }
        let mut seen = HashSet::new();
        for market in &self.markets {
            if market.key.is_empty() || !seen.insert(market.key.as_str()) {
                return Err(ConfigError::Message(format!("market key `{}` is empty or repeated", market.key)));
            }
        }
        Ok(())
    }

    pub fn layout(&self) -> RawLayout {
        RawLayout::new(&self.data_dir).with_suffixes(&self.raw_suffix, &self.error_suffix, &self.regular_suffix)
    }

    pub fn registry(&self) -> MarketRegistry {
        self.markets.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    // Settings::load reads the process environment, keep the tests from racing on it
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_settings(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdingest.toml");
        fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_from_file() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (_dir, path) = write_settings(
            r#"
data_dir = "/srv/market"
raw_suffix = ".json"
log_filter = "debug"

[[markets]]
key = "us"
name = "America"
"#,
        );

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/srv/market"));
        assert_eq!(settings.raw_suffix, ".json");
        assert_eq!(settings.error_suffix, ".error");
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.markets.len(), 1);

        let layout = settings.layout();
        assert_eq!(layout.root, PathBuf::from("/srv/market"));
        assert_eq!(layout.raw_suffix, ".json");
        assert_eq!(settings.registry().lookup("us").unwrap().name, "America");
    }

    #[test]
    fn test_uppercase_market_key_survives_loading() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (_dir, path) = write_settings(
            r#"
data_dir = "/data"

[[markets]]
key = "US"
name = "United States"
"#,
        );

        let settings = Settings::load(Some(&path)).unwrap();
        let registry = settings.registry();
        assert!(registry.lookup("us").is_none());

        let decoded = settings
            .layout()
            .decode(Path::new("/data/US/AAPL/20230615.raw"), &registry)
            .unwrap();
        assert_eq!(decoded.market, Market::new("US", "United States"));
        assert_eq!(decoded.code, "AAPL");
    }

    #[test]
    fn test_env_overrides_file() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (_dir, path) = write_settings("data_dir = \"/srv\"\n");

        std::env::set_var("MDINGEST_RAW_SUFFIX", ".dat");
        std::env::set_var("MDINGEST_DATA_DIR", "/srv/from-env");
        let loaded = Settings::load(Some(&path));
        std::env::remove_var("MDINGEST_RAW_SUFFIX");
        std::env::remove_var("MDINGEST_DATA_DIR");

        let settings = loaded.unwrap();
        assert_eq!(settings.raw_suffix, ".dat");
        assert_eq!(settings.data_dir, PathBuf::from("/srv/from-env"));
        assert_eq!(settings.layout().raw_suffix, ".dat");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_duplicate_suffixes_rejected() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (_dir, path) = write_settings("data_dir = \"/srv\"\nerror_suffix = \".raw\"\n");

        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn test_repeated_market_key_rejected() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (_dir, path) = write_settings(
            r#"
data_dir = "/srv"

[[markets]]
key = "hk"
name = "Hong Kong"

[[markets]]
key = "hk"
name = "HKEX"
"#,
        );

        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("repeated"));
    }

    #[test]
    fn test_default_markets() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (_dir, path) = write_settings("data_dir = \"/srv\"\n");

        let registry = Settings::load(Some(&path)).unwrap().registry();
        assert_eq!(registry.len(), 3);
        assert!(registry.lookup("cn").is_some());
    }
}
