use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tadash_core::*;
use tracing::{debug, info, warn};

use crate::compute::build_table;
use crate::config::{ConfigError, IndicatorSet};

const DEFAULT_CONCURRENCY: usize = 4;

/// Fetches a ticker's daily bars and turns them into an [`IndicatorTable`].
///
/// Every failure mode collapses into a [`PipelineOutcome`]; nothing here
/// returns an error once the pipeline is built.
#[derive(Clone)]
pub struct IndicatorPipeline {
    provider: Arc<dyn DataProvider>,
    indicators: IndicatorSet,
    concurrency: usize,
}

/// One entry of a multi-ticker run, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerOutcome {
    pub requested: String,
    pub outcome: PipelineOutcome,
}

impl IndicatorPipeline {
    pub fn new(provider: Arc<dyn DataProvider>, indicators: IndicatorSet) -> Result<Self, ConfigError> {
        indicators.validate()?;
        Ok(Self {
            provider,
            indicators,
            concurrency: DEFAULT_CONCURRENCY,
        })
    }

    /// Upper bound on provider calls in flight during `compute_many`.
    /// `1` runs tickers one after another.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Same provider, different indicator set.
    pub fn with_indicators(&self, indicators: IndicatorSet) -> Result<Self, ConfigError> {
        indicators.validate()?;
        Ok(Self {
            provider: Arc::clone(&self.provider),
            indicators,
            concurrency: self.concurrency,
        })
    }

    pub fn indicators(&self) -> &IndicatorSet {
        &self.indicators
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn compute(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> PipelineOutcome {
        let ticker = match validate_request(ticker, start, end) {
            Ok(t) => t,
            Err(invalid) => {
                warn!(ticker, %start, %end, reason = %invalid, "Rejected request");
                return PipelineOutcome::Invalid(invalid);
            }
        };

        let bars = match self.provider.fetch_daily_bars(&ticker, start, end).await {
            Ok(bars) => bars,
            Err(DataError::NotFound(msg)) => {
                debug!(%ticker, provider = self.provider.name(), %msg, "Provider has no data");
                return empty(ticker, EmptyReason::NoData);
            }
            Err(e) => {
                warn!(%ticker, provider = self.provider.name(), error = %e, "Provider failed");
                return empty(ticker, EmptyReason::ProviderFailure(e.to_string()));
            }
        };

        let series = PriceSeries::new(ticker.clone(), bars);
        if series.is_empty() {
            return empty(ticker, EmptyReason::NoData);
        }

        let mut table = build_table(series, &self.indicators);
        if self.indicators.drop_incomplete {
            let dropped = table.drop_incomplete_rows();
            debug!(%ticker, dropped, "Dropped incomplete leading rows");
            if table.is_empty() {
                return empty(ticker, EmptyReason::NoCompleteRows);
            }
        }

        info!(%ticker, rows = table.len(), columns = table.columns().len(), "Computed indicators");
        PipelineOutcome::Table(table)
    }

    /// Run `compute` for each ticker independently. Results keep request
    /// order; one ticker's failure never affects another.
    pub async fn compute_many<S: AsRef<str>>(
        &self,
        tickers: &[S],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<TickerOutcome> {
        let requested: Vec<String> = tickers.iter().map(|t| t.as_ref().to_string()).collect();
        stream::iter(requested)
            .map(|requested| async move {
                let outcome = self.compute(&requested, start, end).await;
                TickerOutcome { requested, outcome }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

fn validate_request(ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Ticker, InvalidInput> {
    let ticker = Ticker::parse(ticker)?;
    if start > end {
        return Err(InvalidInput::ReversedRange { start, end });
    }
    Ok(ticker)
}

fn empty(ticker: Ticker, reason: EmptyReason) -> PipelineOutcome {
    warn!(%ticker, %reason, "No usable data");
    PipelineOutcome::Empty(EmptyResult { ticker, reason })
}
