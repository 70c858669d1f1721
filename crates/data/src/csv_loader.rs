use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tadash_core::{Bar, DataError};

/// Load daily bars from a CSV file.
///
/// Expected columns (case-insensitive, flexible ordering):
/// `date` (or `timestamp`, `datetime`), `close` (or `adj close`), and
/// optionally `open`, `high`, `low`, `volume`.
///
/// Rows whose close is blank or `null` are skipped. Bars are returned sorted
/// by date.
pub fn load_bars_from_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::ParseError(format!("Failed to open CSV: {}", e)))?;

    let headers = reader
        .headers()
        .map_err(|e| DataError::ParseError(format!("Failed to read headers: {}", e)))?
        .clone();

    let col_map = resolve_bar_columns(&headers)?;

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let record = result.map_err(|e| DataError::ParseError(format!("CSV record error: {}", e)))?;

        let Some(close) = parse_optional(record.get(col_map.close), "close")? else {
            skipped += 1;
            continue;
        };
        let date = parse_date(record.get(col_map.date).unwrap_or_default())?;

        bars.push(Bar {
            date,
            open: parse_optional(col_map.open.and_then(|i| record.get(i)), "open")?,
            high: parse_optional(col_map.high.and_then(|i| record.get(i)), "high")?,
            low: parse_optional(col_map.low.and_then(|i| record.get(i)), "low")?,
            close,
            volume: parse_optional(col_map.volume.and_then(|i| record.get(i)), "volume")?,
        });
    }

    if skipped > 0 {
        tracing::debug!(path = %path.display(), skipped, "Skipped rows without a close");
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct BarColumnMap {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
}

fn resolve_bar_columns(headers: &csv::StringRecord) -> Result<BarColumnMap, DataError> {
    let date = find_column(headers, &["date", "timestamp", "datetime", "time"])
        .ok_or_else(|| DataError::ParseError("No date column found".into()))?;
    let close = find_column(headers, &["close", "c"])
        .or_else(|| find_column(headers, &["adj close", "adj_close", "adjclose"]))
        .ok_or_else(|| DataError::ParseError("No close column found".into()))?;

    Ok(BarColumnMap {
        date,
        open: find_column(headers, &["open", "o"]),
        high: find_column(headers, &["high", "h"]),
        low: find_column(headers, &["low", "l"]),
        close,
        volume: find_column(headers, &["volume", "vol", "v"]),
    })
}

pub(crate) fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let h = header.trim().to_lowercase();
        names.iter().any(|name| h == *name)
    })
}

fn parse_optional(raw: Option<&str>, field: &str) -> Result<Option<Decimal>, DataError> {
    let s = raw.map(str::trim).unwrap_or_default();
    if s.is_empty() || s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map(Some)
        .map_err(|e| DataError::ParseError(format!("Failed to parse {} '{}': {}", field, s, e)))
}

/// Parse a calendar date; datetimes are truncated to their date.
fn parse_date(s: &str) -> Result<NaiveDate, DataError> {
    let s = s.trim();

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.date());
        }
    }

    // Unix timestamp (seconds)
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt.date_naive());
        }
    }

    Err(DataError::ParseError(format!("Unable to parse date: '{}'", s)))
}
