use crate::core::cache::{Cache, CacheStats};
use crate::core::price::{PriceProvider, PriceWindow};
use crate::core::series::PriceSeries;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

type SeriesKey = (String, PriceWindow);

/// Memoizes lookups per (ticker, window). Failures are memoized as well so a
/// request never asks twice for a ticker that already failed.
#[derive(Clone)]
pub struct CachingPriceProvider<T: PriceProvider> {
    inner: T,
    cache: Arc<Cache<SeriesKey, Result<PriceSeries, String>>>,
}

impl<T: PriceProvider> CachingPriceProvider<T> {
    pub fn new(inner: T) -> Self {
        Self::with_cache(inner, Arc::new(Cache::new()))
    }

    pub fn with_cache(
        inner: T,
        cache: Arc<Cache<SeriesKey, Result<PriceSeries, String>>>,
    ) -> Self {
        Self { inner, cache }
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

#[async_trait]
impl<T: PriceProvider + Send + Sync> PriceProvider for CachingPriceProvider<T> {
    async fn fetch_series(&self, ticker: &str, window: PriceWindow) -> Result<PriceSeries> {
        let key = (ticker.to_string(), window);
        if let Some(cached_result) = self.cache.get(&key).await {
            debug!("Cache hit for series: {} {}", ticker, window);
            return cached_result.map_err(|e| anyhow!(e));
        }
        debug!("Cache miss for series: {} {}", ticker, window);
        let fetched = self
            .inner
            .fetch_series(ticker, window)
            .await
            .map_err(|e| e.to_string());
        self.cache.put(key, fetched).await.map_err(|e| anyhow!(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::HistoricalPeriod;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockInnerProvider {
        call_count: AtomicUsize,
    }

    impl MockInnerProvider {
        fn new() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl<'a> PriceProvider for &'a MockInnerProvider {
        async fn fetch_series(&self, ticker: &str, _window: PriceWindow) -> Result<PriceSeries> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if ticker == "AAPL" {
                let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
                Ok(PriceSeries::from_points(vec![(date, 150.0)]))
            } else {
                Err(anyhow!("Unknown symbol"))
            }
        }
    }

    #[tokio::test]
    async fn test_caching_price_provider() {
        let inner_provider = MockInnerProvider::new();
        let caching_provider = CachingPriceProvider::new(&inner_provider);
        let one_year = PriceWindow::Trailing(HistoricalPeriod::OneYear);

        // First call - should hit inner provider
        let result1 = caching_provider.fetch_series("AAPL", one_year).await.unwrap();
        assert_eq!(result1.last().unwrap().price, 150.0);
        assert_eq!(inner_provider.call_count.load(Ordering::SeqCst), 1);

        // Second call - should be cached
        caching_provider.fetch_series("AAPL", one_year).await.unwrap();
        assert_eq!(inner_provider.call_count.load(Ordering::SeqCst), 1);

        // Same ticker, different window
        caching_provider
            .fetch_series("AAPL", PriceWindow::Trailing(HistoricalPeriod::FiveDays))
            .await
            .unwrap();
        assert_eq!(inner_provider.call_count.load(Ordering::SeqCst), 2);

        // Failures are cached too
        let err = caching_provider.fetch_series("GOOG", one_year).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown symbol");
        let _ = caching_provider.fetch_series("GOOG", one_year).await;
        assert_eq!(inner_provider.call_count.load(Ordering::SeqCst), 3);

        let stats = caching_provider.stats().await;
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 3);
    }
}
