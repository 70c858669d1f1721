//! Daily bars from the Yahoo Finance chart endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use reqwest::{Client, StatusCode, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tadash_core::{Bar, DataError, DataProvider, Ticker};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Exchange-local timestamps can sit on the neighbouring UTC day, so the
/// request window is padded and the bars filtered afterwards.
const RANGE_PADDING: Days = Days::new(2);

pub struct YahooProvider {
    client: Client,
    base_url: Url,
}

impl YahooProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; tadash)")
            .build()
            .map_err(|e| DataError::ApiError(format!("Failed to build HTTP client: {}", e)))?;
        let base_url: String = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| DataError::ApiError(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DataError::ApiError(format!("Invalid base URL {}", base_url)));
        }
        Ok(Self { client, base_url })
    }

    /// `{base_url}/{ticker}` with the ticker as one percent-encoded path
    /// segment.
    fn chart_url(&self, ticker: &Ticker) -> Result<Url, DataError> {
        if matches!(ticker.as_str(), "." | "..") {
            return Err(DataError::NotFound(format!("Not a ticker symbol: {}", ticker)));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DataError::ApiError(format!("Invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .push(ticker.as_str());
        Ok(url)
    }

    fn query(start: NaiveDate, end: NaiveDate) -> [(&'static str, String); 4] {
        let period1 = midnight_utc(start.checked_sub_days(RANGE_PADDING).unwrap_or(start));
        let period2 = midnight_utc(end.checked_add_days(RANGE_PADDING).unwrap_or(end));
        [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
            ("events", "history".to_string()),
        ]
    }
}

#[async_trait]
impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_daily_bars(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let url = self.chart_url(ticker)?;
        tracing::debug!(%ticker, %url, %start, %end, "Requesting chart");

        let response = self
            .client
            .get(url)
            .query(&Self::query(start, end))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(request_error)?;

        if status == StatusCode::NOT_FOUND {
            return Err(DataError::NotFound(format!("{}: {}", ticker, error_description(&body))));
        }
        if !status.is_success() {
            return Err(DataError::ApiError(format!(
                "HTTP {} for {}: {}",
                status,
                ticker,
                error_description(&body)
            )));
        }

        let chart: ChartResponse = serde_json::from_str(&body)
            .map_err(|e| DataError::ParseError(format!("Malformed chart payload: {}", e)))?;

        Ok(bars_from_chart(chart)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn request_error(e: reqwest::Error) -> DataError {
    if e.is_timeout() {
        DataError::Timeout(e.to_string())
    } else {
        DataError::ApiError(e.to_string())
    }
}

fn error_description(body: &str) -> String {
    serde_json::from_str::<ChartResponse>(body)
        .ok()
        .and_then(|c| c.chart.error)
        .map(|e| format!("{} ({})", e.description, e.code))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn to_decimal(v: Option<&Option<f64>>) -> Option<Decimal> {
    let v = (*v?)?;
    Decimal::try_from(v).ok().map(|d| d.round_dp(6).normalize())
}

fn bars_from_chart(response: ChartResponse) -> Result<Vec<Bar>, DataError> {
    if let Some(err) = response.chart.error {
        return Err(DataError::NotFound(format!("{} ({})", err.description, err.code)));
    }
    let Some(data) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let offset = data.meta.gmtoffset;

    let mut bars = Vec::with_capacity(data.timestamp.len());
    for (i, ts) in data.timestamp.iter().enumerate() {
        // rows without a close are non-trading placeholders
        let Some(close) = to_decimal(quote.close.get(i)) else {
            continue;
        };
        let date = ts
            .checked_add(offset)
            .and_then(|local| DateTime::from_timestamp(local, 0))
            .ok_or_else(|| {
                DataError::ParseError(format!("Timestamp {} with offset {} is out of range", ts, offset))
            })?
            .date_naive();
        bars.push(Bar {
            date,
            open: to_decimal(quote.open.get(i)),
            high: to_decimal(quote.high.get(i)),
            low: to_decimal(quote.low.get(i)),
            close,
            volume: to_decimal(quote.volume.get(i)),
        });
    }

    Ok(bars)
}
