//! Terminal rendering of pipeline outcomes.

use rust_decimal::Decimal;
use std::path::Path;
use tadash_data::export::ExportError;
use tadash_core::{IndicatorTable, PipelineOutcome};
use tadash_engine::config::RSI_COLUMN;

pub const RSI_OVERBOUGHT: Decimal = Decimal::from_parts(70, 0, 0, false, 0);
pub const RSI_OVERSOLD: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

fn fmt_value(value: Option<Decimal>) -> String {
    value
        .map(|v| v.round_dp(2).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn rsi_note(rsi: Decimal) -> Option<&'static str> {
    if rsi >= RSI_OVERBOUGHT {
        Some("overbought")
    } else if rsi <= RSI_OVERSOLD {
        Some("oversold")
    } else {
        None
    }
}

/// One line describing the latest row of a table.
pub fn latest_row_summary(table: &IndicatorTable) -> String {
    let Some(bar) = table.bars().last() else {
        return format!("{}: no rows", table.ticker);
    };
    let last = table.len() - 1;

    let mut parts = vec![
        format!("{} {}", table.ticker, bar.date.format("%Y-%m-%d")),
        format!("Close {}", bar.close.round_dp(2)),
    ];
    for column in table.columns() {
        let value = column.values[last];
        let mut part = format!("{} {}", column.name, fmt_value(value));
        if column.name == RSI_COLUMN {
            if let Some(note) = value.and_then(rsi_note) {
                part.push_str(&format!(" ({})", note));
            }
        }
        parts.push(part);
    }
    parts.join("  ")
}

/// The line printed for one requested ticker. Failures are prefixed with
/// `error:`, other empty or rejected requests with `warning:`.
pub fn outcome_line(requested: &str, outcome: &PipelineOutcome) -> String {
    match outcome {
        PipelineOutcome::Table(table) => latest_row_summary(table),
        PipelineOutcome::Empty(empty) if empty.is_failure() => {
            format!("error: {}: {}", empty.ticker, empty.reason)
        }
        PipelineOutcome::Empty(empty) => format!("warning: {}: {}", empty.ticker, empty.reason),
        PipelineOutcome::Invalid(invalid) => format!("warning: {:?}: {}", requested, invalid),
    }
}

pub fn export_error_line(ticker: &str, path: &Path, error: &ExportError) -> String {
    format!("error: {}: could not write {}: {}", ticker, path.display(), error)
}

/// Closing line of a batch run.
pub fn batch_footer(computed: usize, export_failures: usize, total: usize) -> String {
    if export_failures == 0 {
        format!("{} of {} tickers computed", computed, total)
    } else {
        format!(
            "{} of {} tickers computed, {} CSV exports failed",
            computed, total, export_failures
        )
    }
}
