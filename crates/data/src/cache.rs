//! Read-through cache in front of any [`DataProvider`].
//!
//! Keys are `(ticker, start, end)`; eviction is least-recently-used with a
//! fixed capacity. Only successful responses are stored, so a transient
//! provider failure is retried on the next request. A capacity of zero turns
//! the cache into a pass-through.

use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::IndexMap;
use std::sync::Arc;
use tadash_core::{Bar, DataError, DataProvider, Ticker};
use tokio::sync::Mutex;

type CacheKey = (Ticker, NaiveDate, NaiveDate);

pub struct CachedProvider<P> {
    inner: P,
    capacity: usize,
    // Most recently used entries live at the back.
    entries: Mutex<IndexMap<CacheKey, Arc<Vec<Bar>>>>,
}

impl<P: DataProvider> CachedProvider<P> {
    pub fn new(inner: P, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            entries: Mutex::new(IndexMap::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Arc<Vec<Bar>>> {
        let mut entries = self.entries.lock().await;
        let index = entries.get_index_of(key)?;
        let last = entries.len() - 1;
        entries.move_index(index, last);
        entries.get_index(last).map(|(_, bars)| Arc::clone(bars))
    }

    async fn store(&self, key: CacheKey, bars: Arc<Vec<Bar>>) {
        let mut entries = self.entries.lock().await;
        // A concurrent miss for the same key may have stored it already.
        entries.shift_remove(&key);
        while entries.len() >= self.capacity {
            match entries.shift_remove_index(0) {
                Some((evicted, _)) => {
                    tracing::trace!(ticker = %evicted.0, "Evicted cached series");
                }
                None => break,
            }
        }
        entries.insert(key, bars);
    }
}

#[async_trait]
impl<P: DataProvider> DataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_daily_bars(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        if self.capacity == 0 {
            return self.inner.fetch_daily_bars(ticker, start, end).await;
        }

        let key = (ticker.clone(), start, end);
        if let Some(bars) = self.lookup(&key).await {
            tracing::debug!(%ticker, %start, %end, "Cache hit");
            return Ok(bars.as_ref().clone());
        }

        let bars = self.inner.fetch_daily_bars(ticker, start, end).await?;
        self.store(key, Arc::new(bars.clone())).await;
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns one bar whose close encodes the call number; fails for `ERR`.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch_daily_bars(
            &self,
            ticker: &Ticker,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Bar>, DataError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if ticker.as_str() == "ERR" {
                return Err(DataError::Timeout("slow upstream".into()));
            }
            Ok(vec![Bar::close_only(start, Decimal::from(n))])
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn ticker(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_hit_skips_inner_provider() {
        let cache = CachedProvider::new(CountingProvider::default(), 4);
        let a = cache.fetch_daily_bars(&ticker("AAA.SA"), day(1), day(5)).await.unwrap();
        let b = cache.fetch_daily_bars(&ticker("AAA.SA"), day(1), day(5)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_share_entries() {
        let cache = CachedProvider::new(CountingProvider::default(), 4);
        let a = cache.fetch_daily_bars(&ticker("AAA.SA"), day(1), day(5)).await.unwrap();
        let b = cache.fetch_daily_bars(&ticker("AAA.SA"), day(1), day(6)).await.unwrap();
        let c = cache.fetch_daily_bars(&ticker("BBB.SA"), day(1), day(5)).await.unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len().await, 3);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = CachedProvider::new(CountingProvider::default(), 4);
        assert!(cache.fetch_daily_bars(&ticker("ERR"), day(1), day(5)).await.is_err());
        assert!(cache.fetch_daily_bars(&ticker("ERR"), day(1), day(5)).await.is_err());
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = CachedProvider::new(CountingProvider::default(), 2);
        cache.fetch_daily_bars(&ticker("A"), day(1), day(2)).await.unwrap();
        cache.fetch_daily_bars(&ticker("B"), day(1), day(2)).await.unwrap();
        // touch A so B becomes least recently used
        cache.fetch_daily_bars(&ticker("A"), day(1), day(2)).await.unwrap();
        cache.fetch_daily_bars(&ticker("C"), day(1), day(2)).await.unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 3);

        cache.fetch_daily_bars(&ticker("A"), day(1), day(2)).await.unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 3);
        cache.fetch_daily_bars(&ticker("B"), day(1), day(2)).await.unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 4);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_zero_capacity_passes_through() {
        let cache = CachedProvider::new(CountingProvider::default(), 0);
        cache.fetch_daily_bars(&ticker("A"), day(1), day(2)).await.unwrap();
        cache.fetch_daily_bars(&ticker("A"), day(1), day(2)).await.unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 0);
    }
}
