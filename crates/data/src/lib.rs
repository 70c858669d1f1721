pub mod cache;
pub mod csv_loader;
pub mod export;
pub mod symbols;
pub mod yahoo;

pub use cache::CachedProvider;
pub use yahoo::YahooProvider;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use tadash_core::{Bar, DataError, DataProvider, Ticker};

/// A CSV-file-based data provider reading `<directory>/<ticker>.csv`.
pub struct CsvDataProvider {
    pub directory: PathBuf,
}

impl CsvDataProvider {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl CsvDataProvider {
    /// `<directory>/<ticker>.csv`. Tickers that could name a file outside the
    /// directory are treated as unknown.
    fn file_for(&self, ticker: &Ticker) -> Result<PathBuf, DataError> {
        let symbol = ticker.as_str();
        if symbol.contains(['/', '\\']) || symbol.contains("..") {
            return Err(DataError::NotFound(format!("Not a ticker symbol: {}", symbol)));
        }
        Ok(self.directory.join(format!("{}.csv", symbol)))
    }
}

#[async_trait]
impl DataProvider for CsvDataProvider {
    fn name(&self) -> &str {
        "csv"
    }

    async fn fetch_daily_bars(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let file_path = self.file_for(ticker)?;
        if !file_path.exists() {
            return Err(DataError::NotFound(format!(
                "CSV file not found: {}",
                file_path.display()
            )));
        }

        let bars = tokio::task::spawn_blocking(move || csv_loader::load_bars_from_csv(&file_path))
            .await
            .map_err(|e| DataError::ApiError(format!("CSV loader task failed: {}", e)))??;

        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_csv_provider_filters_inclusive_range() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("PETR4.SA.csv"),
            "Date,Close\n2024-01-02,30\n2024-01-03,31\n2024-01-04,32\n2024-01-05,33\n",
        )
        .unwrap();

        let provider = CsvDataProvider::new(dir.path());
        let ticker = Ticker::parse("PETR4.SA").unwrap();
        let bars = provider
            .fetch_daily_bars(&ticker, day(1, 3), day(1, 4))
            .await
            .unwrap();
        let dates: Vec<_> = bars.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![day(1, 3), day(1, 4)]);
    }

    #[tokio::test]
    async fn test_csv_provider_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDataProvider::new(dir.path());
        let ticker = Ticker::parse("FAKE9.SA").unwrap();
        let result = provider
            .fetch_daily_bars(&ticker, day(1, 1), day(12, 31))
            .await;
        assert!(matches!(result, Err(DataError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_csv_provider_stays_inside_its_directory() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(root.path().join("secret.csv"), "Date,Close\n2024-01-02,42\n").unwrap();

        let provider = CsvDataProvider::new(&data);
        for symbol in ["../secret", "..\\secret", "sub/../../secret", ".."] {
            let ticker = Ticker::parse(symbol).unwrap();
            let result = provider.fetch_daily_bars(&ticker, day(1, 1), day(12, 31)).await;
            assert!(matches!(result, Err(DataError::NotFound(_))), "{symbol}");
        }
    }
}
