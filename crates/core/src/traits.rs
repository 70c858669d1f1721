use crate::models::*;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Data Provider Trait
// ---------------------------------------------------------------------------

/// Errors that can occur while fetching price data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
}

/// Source of historical daily bars.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Load daily bars for `ticker` with `start <= date <= end`.
    ///
    /// An unknown ticker or a range without trading days may be reported
    /// either as `Ok(vec![])` or as `Err(DataError::NotFound)`.
    async fn fetch_daily_bars(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError>;
}

#[async_trait]
impl<P: DataProvider + ?Sized> DataProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch_daily_bars(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        (**self).fetch_daily_bars(ticker, start, end).await
    }
}

#[async_trait]
impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch_daily_bars(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        (**self).fetch_daily_bars(ticker, start, end).await
    }
}
