use ahash::AHashMap;
use serde::Deserialize;

// A market as named by the first directory level under the data root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Market {
    pub key: String,  // directory segment, e.g. "us"
    pub name: String, // display name, e.g. "United States"
}

impl Market {
    pub fn new(key: &str, name: &str) -> Self {
        Self { key: key.to_string(), name: name.to_string() }
    }
}

/// Read-only lookup from directory key to `Market`.
///
/// Built once before the scanner starts and shared behind an `Arc`;
/// nothing in the pipeline mutates it afterwards.
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    markets: AHashMap<String, Market>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self { markets: AHashMap::new() }
    }

    // Later registrations with the same key replace earlier ones
    pub fn register(&mut self, market: Market) {
        self.markets.insert(market.key.clone(), market);
    }

    pub fn lookup(&self, key: &str) -> Option<&Market> {
        self.markets.get(key)
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

impl FromIterator<Market> for MarketRegistry {
    fn from_iter<I: IntoIterator<Item = Market>>(iter: I) -> Self {
        let mut registry = MarketRegistry::new();
        for market in iter {
            registry.register(market);
        }
        registry
    }
}
