use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// An exchange-qualified symbol (e.g. `PETR4.SA`).
///
/// The pipeline never looks inside it; it is only handed to a data provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Trim surrounding whitespace and reject an empty symbol.
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidInput::EmptyTicker);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entry of the read-only symbol list used to populate ticker selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub ticker: Ticker,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// A single daily bar. Only `close` feeds the indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Decimal,
    pub volume: Option<Decimal>,
}

impl Bar {
    /// A bar carrying only a closing price.
    pub fn close_only(date: NaiveDate, close: Decimal) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }
}

/// Daily bars for one ticker, ascending by date with unique dates and
/// strictly positive closes.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: Ticker,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Normalize raw provider bars into a series.
    ///
    /// Bars are sorted by date; on a duplicated date the later bar wins.
    /// Bars with a non-positive close are dropped.
    pub fn new(ticker: Ticker, mut bars: Vec<Bar>) -> Self {
        bars.retain(|b| b.close > Decimal::ZERO);
        // Stable sort keeps provider order within a date, so `last` is the latest row.
        bars.sort_by_key(|b| b.date);

        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(prev) if prev.date == bar.date => *prev = bar,
                _ => deduped.push(bar),
            }
        }

        Self {
            ticker,
            bars: deduped,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Indicator Table
// ---------------------------------------------------------------------------

/// One derived column, aligned with the table's dates. `None` means the
/// indicator has no value at that date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorColumn {
    pub name: String,
    pub values: Vec<Option<Decimal>>,
}

impl IndicatorColumn {
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Index of the first defined value.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("column {name} has {actual} values but the table has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("column {0} already exists")]
    DuplicateColumn(String),
}

/// A price series augmented with derived indicator columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorTable {
    pub ticker: Ticker,
    bars: Vec<Bar>,
    columns: Vec<IndicatorColumn>,
}

impl IndicatorTable {
    pub fn new(series: PriceSeries) -> Self {
        Self {
            ticker: series.ticker,
            bars: series.bars,
            columns: Vec::new(),
        }
    }

    /// Append a derived column. Its length must match the number of rows.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<Decimal>>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if values.len() != self.bars.len() {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.bars.len(),
                actual: values.len(),
            });
        }
        if self.column(&name).is_some() {
            return Err(TableError::DuplicateColumn(name));
        }
        self.columns.push(IndicatorColumn { name, values });
        Ok(())
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn columns(&self) -> &[IndicatorColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&IndicatorColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Values of every column at `row`, in column order.
    pub fn row_values(&self, row: usize) -> Vec<Option<Decimal>> {
        self.columns
            .iter()
            .map(|c| c.values.get(row).copied().flatten())
            .collect()
    }

    /// Drop the leading rows where any column is undefined. Returns the number
    /// of rows removed.
    ///
    /// Only the leading run is trimmed; a gap after the first fully defined
    /// row is kept as-is.
    pub fn drop_incomplete_rows(&mut self) -> usize {
        let first_complete = (0..self.bars.len())
            .find(|&row| self.columns.iter().all(|c| c.values[row].is_some()))
            .unwrap_or(self.bars.len());

        if first_complete > 0 {
            self.bars.drain(..first_complete);
            for column in &mut self.columns {
                column.values.drain(..first_complete);
            }
        }
        first_complete
    }
}

// ---------------------------------------------------------------------------
// Pipeline Outcomes
// ---------------------------------------------------------------------------

/// Input rejected before any provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("ticker symbol is empty")]
    EmptyTicker,
    #[error("start date {start} is after end date {end}")]
    ReversedRange { start: NaiveDate, end: NaiveDate },
}

/// Why a computation produced no usable data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmptyReason {
    #[error("no price data for this ticker and period")]
    NoData,
    #[error("data provider failed: {0}")]
    ProviderFailure(String),
    #[error("no date has every requested indicator defined")]
    NoCompleteRows,
}

/// Explicit "no usable data" marker. A normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyResult {
    pub ticker: Ticker,
    pub reason: EmptyReason,
}

impl EmptyResult {
    /// Provider failures are surfaced as errors, everything else as warnings.
    pub fn is_failure(&self) -> bool {
        matches!(self.reason, EmptyReason::ProviderFailure(_))
    }
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Table(IndicatorTable),
    Empty(EmptyResult),
    Invalid(InvalidInput),
}

impl PipelineOutcome {
    pub fn table(&self) -> Option<&IndicatorTable> {
        match self {
            PipelineOutcome::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, PipelineOutcome::Table(_))
    }
}
