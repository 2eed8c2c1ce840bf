mod cache;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::Holding;

pub use cache::{
    DEFAULT_HISTORY_TTL, DEFAULT_QUOTE_TTL, DataQuality, HistoricalReturn, PriceCache, TtlCache,
    TtlPolicy,
};

/// Minimum spacing between two network fetches.
pub const DEFAULT_REFRESH_PACING: Duration = Duration::from_secs(12);

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("No quote available for {0}")]
    NotFound(String),

    #[error("Price source failed for {ticker}: {reason}")]
    Source { ticker: String, reason: String },
}

pub trait PriceSource {
    fn fetch_price(&self, ticker: &str) -> impl Future<Output = Result<f64, PriceError>> + Send;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticQuotes(BTreeMap<String, f64>);

impl StaticQuotes {
    pub fn new(quotes: BTreeMap<String, f64>) -> Self {
        Self(
            quotes
                .into_iter()
                .map(|(ticker, price)| (ticker.trim().to_ascii_uppercase(), price))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PriceSource for StaticQuotes {
    async fn fetch_price(&self, ticker: &str) -> Result<f64, PriceError> {
        self.0
            .get(&ticker.trim().to_ascii_uppercase())
            .copied()
            .ok_or_else(|| PriceError::NotFound(ticker.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub updated: Vec<String>,
    pub cached: Vec<String>,
    pub failed: Vec<String>,
    pub cancelled: bool,
}

/// Distinct tickers needing a quote, in first-seen order. `CASH` is never
/// fetched.
pub fn refresh_batch(holdings: &[Holding]) -> Vec<String> {
    let mut seen = HashSet::new();
    holdings
        .iter()
        .filter(|holding| !holding.is_cash())
        .map(|holding| holding.ticker.trim().to_ascii_uppercase())
        .filter(|ticker| !ticker.is_empty() && seen.insert(ticker.clone()))
        .collect()
}

/// Refreshes holding prices one ticker at a time.
///
/// Fresh cache entries skip the network. Consecutive fetches are spaced at
/// least `pacing` apart, and `cancel` is checked before each ticker; prices
/// gathered before a cancellation are still applied.
pub async fn refresh_prices<S: PriceSource>(
    holdings: &mut [Holding],
    source: &S,
    cache: &mut PriceCache,
    pacing: Duration,
    cancel: &AtomicBool,
) -> RefreshReport {
    let mut report = RefreshReport::default();
    let mut prices: HashMap<String, f64> = HashMap::new();
    let mut last_fetch: Option<Instant> = None;

    for ticker in refresh_batch(holdings) {
        if cancel.load(Ordering::Relaxed) {
            info!(remaining = %ticker, "price refresh cancelled");
            report.cancelled = true;
            break;
        }

        if let Some(price) = cache.quote(&ticker, Instant::now()) {
            debug!(%ticker, price, "quote served from cache");
            prices.insert(ticker.clone(), price);
            report.cached.push(ticker);
            continue;
        }

        if let Some(previous) = last_fetch {
            let elapsed = previous.elapsed();
            if elapsed < pacing {
                tokio::time::sleep(pacing - elapsed).await;
            }
            if cancel.load(Ordering::Relaxed) {
                info!(remaining = %ticker, "price refresh cancelled");
                report.cancelled = true;
                break;
            }
        }

        last_fetch = Some(Instant::now());
        match source.fetch_price(&ticker).await {
            Ok(price) if price.is_finite() && price >= 0.0 => {
                cache.store_quote(&ticker, price, Instant::now());
                prices.insert(ticker.clone(), price);
                report.updated.push(ticker);
            }
            Ok(price) => {
                warn!(%ticker, price, "ignoring invalid quote");
                report.failed.push(ticker);
            }
            Err(e) => {
                warn!(%ticker, error = %e, "price fetch failed");
                report.failed.push(ticker);
            }
        }
    }

    for holding in holdings.iter_mut() {
        if let Some(price) = prices.get(&holding.ticker.trim().to_ascii_uppercase()) {
            holding.set_price(*price);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct RecordingSource {
        quotes: StaticQuotes,
        calls: Mutex<Vec<String>>,
        cancel_after_first: Option<Arc<AtomicBool>>,
    }

    impl RecordingSource {
        fn new(quotes: &[(&str, f64)]) -> Self {
            Self {
                quotes: StaticQuotes::new(
                    quotes
                        .iter()
                        .map(|(ticker, price)| (ticker.to_string(), *price))
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
                cancel_after_first: None,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("lock calls").clone()
        }
    }

    impl PriceSource for RecordingSource {
        async fn fetch_price(&self, ticker: &str) -> Result<f64, PriceError> {
            self.calls.lock().expect("lock calls").push(ticker.to_string());
            if let Some(flag) = &self.cancel_after_first {
                flag.store(true, Ordering::Relaxed);
            }
            self.quotes.fetch_price(ticker).await
        }
    }

    fn holdings() -> Vec<Holding> {
        vec![
            Holding::new("xeqt", 10.0, 30.0),
            Holding::new("CASH", 500.0, 1.0),
            Holding::new("VFV", 5.0, 120.0),
            Holding::new("XEQT", 2.0, 30.0),
        ]
    }

    #[test]
    fn batch_is_distinct_and_skips_cash() {
        let mut with_lowercase_cash = holdings();
        with_lowercase_cash.push(Holding::new("cash", 1.0, 1.0));
        assert_eq!(refresh_batch(&with_lowercase_cash), vec!["XEQT", "VFV"]);
    }

    #[test]
    fn cash_holdings_are_pinned_to_one() {
        let mut cash = Holding::new("CASH", 250.0, 9.0);
        assert_eq!(cash.price(), 1.0);
        cash.set_price(3.0);
        assert_eq!(cash.market_value(), 250.0);
    }

    #[tokio::test]
    async fn refresh_updates_prices_and_fills_cache() {
        let source = RecordingSource::new(&[("XEQT", 32.0), ("VFV", 130.0)]);
        let mut cache = PriceCache::default();
        let mut holdings = holdings();
        let cancel = AtomicBool::new(false);

        let report =
            refresh_prices(&mut holdings, &source, &mut cache, Duration::ZERO, &cancel).await;
        assert_eq!(report.updated, vec!["XEQT", "VFV"]);
        assert!(report.failed.is_empty() && !report.cancelled);
        assert_eq!(holdings[0].current_price, 32.0);
        assert_eq!(holdings[1].current_price, 1.0);
        assert_eq!(holdings[2].current_price, 130.0);
        assert_eq!(holdings[3].current_price, 32.0);
        assert_eq!(cache.quote("xeqt", Instant::now()), Some(32.0));
    }

    #[tokio::test]
    async fn fresh_cache_entries_skip_the_source() {
        let source = RecordingSource::new(&[("XEQT", 32.0), ("VFV", 130.0)]);
        let mut cache = PriceCache::default();
        cache.store_quote("VFV", 128.0, Instant::now());
        let mut holdings = holdings();

        let report = refresh_prices(
            &mut holdings,
            &source,
            &mut cache,
            Duration::ZERO,
            &AtomicBool::new(false),
        )
        .await;
        assert_eq!(source.calls(), vec!["XEQT"]);
        assert_eq!(report.cached, vec!["VFV"]);
        assert_eq!(holdings[2].current_price, 128.0);
    }

    #[tokio::test]
    async fn missing_quotes_are_reported_and_leave_price_alone() {
        let source = RecordingSource::new(&[("XEQT", 32.0)]);
        let mut holdings = holdings();
        let report = refresh_prices(
            &mut holdings,
            &source,
            &mut PriceCache::default(),
            Duration::ZERO,
            &AtomicBool::new(false),
        )
        .await;
        assert_eq!(report.failed, vec!["VFV"]);
        assert_eq!(holdings[2].current_price, 120.0);
    }

    #[tokio::test]
    async fn consecutive_fetches_are_paced() {
        let source = RecordingSource::new(&[("XEQT", 32.0), ("VFV", 130.0)]);
        let pacing = Duration::from_millis(30);
        let started = Instant::now();
        refresh_prices(
            &mut holdings(),
            &source,
            &mut PriceCache::default(),
            pacing,
            &AtomicBool::new(false),
        )
        .await;
        assert!(started.elapsed() >= pacing);
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn cancellation_stops_between_items() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut source = RecordingSource::new(&[("XEQT", 32.0), ("VFV", 130.0)]);
        source.cancel_after_first = Some(Arc::clone(&flag));
        let mut holdings = holdings();

        let report = refresh_prices(
            &mut holdings,
            &source,
            &mut PriceCache::default(),
            Duration::ZERO,
            &flag,
        )
        .await;
        assert!(report.cancelled);
        assert_eq!(source.calls(), vec!["XEQT"]);
        assert_eq!(holdings[0].current_price, 32.0);
        assert_eq!(holdings[2].current_price, 120.0);
    }

    #[tokio::test]
    async fn cancelled_before_start_fetches_nothing() {
        let source = RecordingSource::new(&[("XEQT", 32.0)]);
        let report = refresh_prices(
            &mut holdings(),
            &source,
            &mut PriceCache::default(),
            Duration::ZERO,
            &AtomicBool::new(true),
        )
        .await;
        assert!(report.cancelled);
        assert!(source.calls().is_empty());
    }
}
