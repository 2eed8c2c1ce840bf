use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::Rate;

pub const DEFAULT_QUOTE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_HISTORY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How long cached quotes and return histories stay fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub quote_ttl: Duration,
    pub history_ttl: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            quote_ttl: DEFAULT_QUOTE_TTL,
            history_ttl: DEFAULT_HISTORY_TTL,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Ticker-keyed cache. Every read takes `now` so expiry never depends on
/// the wall clock.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: HashMap<String, Entry<V>>,
}

fn cache_key(ticker: &str) -> String {
    ticker.trim().to_ascii_uppercase()
}

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, ticker: &str, now: Instant) -> Option<&V> {
        self.entries
            .get(&cache_key(ticker))
            .filter(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)
            .map(|entry| &entry.value)
    }

    pub fn insert(&mut self, ticker: &str, value: V, now: Instant) {
        self.entries.insert(
            cache_key(ticker),
            Entry {
                value,
                stored_at: now,
            },
        );
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Sufficient,
    Limited,
    Insufficient,
}

impl DataQuality {
    pub fn from_sample_years(years: f64) -> Self {
        if !years.is_finite() || years < 1.0 {
            DataQuality::Insufficient
        } else if years < 5.0 {
            DataQuality::Limited
        } else {
            DataQuality::Sufficient
        }
    }
}

/// Trailing return statistics for one ticker. Informational only; the
/// projection engine takes rates from scenario assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalReturn {
    pub ticker: String,
    pub annualized_return: Rate,
    pub dividend_yield: Rate,
    pub sample_years: f64,
}

impl HistoricalReturn {
    pub fn data_quality(&self) -> DataQuality {
        DataQuality::from_sample_years(self.sample_years)
    }
}

/// Quote and history caches owned by the price-refresh collaborator.
#[derive(Debug, Clone)]
pub struct PriceCache {
    quotes: TtlCache<f64>,
    history: TtlCache<HistoricalReturn>,
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new(TtlPolicy::default())
    }
}

impl PriceCache {
    pub fn new(policy: TtlPolicy) -> Self {
        Self {
            quotes: TtlCache::new(policy.quote_ttl),
            history: TtlCache::new(policy.history_ttl),
        }
    }

    pub fn quote(&self, ticker: &str, now: Instant) -> Option<f64> {
        self.quotes.get(ticker, now).copied()
    }

    pub fn store_quote(&mut self, ticker: &str, price: f64, now: Instant) {
        self.quotes.insert(ticker, price, now);
    }

    pub fn history(&self, ticker: &str, now: Instant) -> Option<&HistoricalReturn> {
        self.history.get(ticker, now)
    }

    pub fn store_history(&mut self, history: HistoricalReturn, now: Instant) {
        let ticker = history.ticker.clone();
        self.history.insert(&ticker, history, now);
    }

    pub fn purge_expired(&mut self, now: Instant) -> usize {
        self.quotes.purge_expired(now) + self.history.purge_expired(now)
    }
}
