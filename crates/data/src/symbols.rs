//! Read-only symbol list: a CSV of `ticker,name` rows loaded once at startup.

use std::path::Path;
use tadash_core::{DataError, SymbolEntry, Ticker};

use crate::csv_loader::find_column;

pub fn load_symbols(path: &Path) -> Result<Vec<SymbolEntry>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::ParseError(format!("Failed to open symbol list: {}", e)))?;

    let headers = reader
        .headers()
        .map_err(|e| DataError::ParseError(format!("Failed to read headers: {}", e)))?
        .clone();
    let ticker_col = find_column(&headers, &["ticker", "symbol", "code"])
        .ok_or_else(|| DataError::ParseError("No ticker column found".into()))?;
    let name_col = find_column(&headers, &["name", "display_name", "company"]);

    let mut symbols: Vec<SymbolEntry> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DataError::ParseError(format!("CSV record error: {}", e)))?;
        let Ok(ticker) = Ticker::parse(record.get(ticker_col).unwrap_or_default()) else {
            continue;
        };
        if symbols.iter().any(|s| s.ticker == ticker) {
            tracing::warn!(%ticker, "Duplicate symbol in list, keeping the first entry");
            continue;
        }
        let name = name_col
            .and_then(|i| record.get(i))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| ticker.to_string());
        symbols.push(SymbolEntry { ticker, name });
    }

    tracing::info!(path = %path.display(), count = symbols.len(), "Loaded symbol list");
    Ok(symbols)
}
