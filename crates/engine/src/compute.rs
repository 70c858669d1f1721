use tadash_core::{IndicatorTable, PriceSeries};
use tadash_indicators::series::{self, Column};

use crate::config::*;

/// Compute every requested indicator over the series' closes and merge the
/// columns into a table that keeps the series' date order.
///
/// Each column has one entry per date. Short histories simply leave the
/// column undefined.
pub fn build_table(series: PriceSeries, set: &IndicatorSet) -> IndicatorTable {
    let closes = series.closes();
    let mut columns: Vec<(String, Column)> = Vec::new();

    for window in &set.sma_windows {
        columns.push((sma_column(*window), series::sma(&closes, *window)));
    }

    if set.rsi.enabled {
        columns.push((RSI_COLUMN.to_string(), series::rsi(&closes, set.rsi.window)));
    }

    if set.macd.enabled {
        let m = &set.macd;
        let macd = series::macd(&closes, m.fast, m.slow, m.signal);
        columns.push((MACD_COLUMN.to_string(), macd.macd));
        columns.push((MACD_SIGNAL_COLUMN.to_string(), macd.signal));
    }

    if set.bollinger.enabled {
        let b = &set.bollinger;
        let bands = series::bollinger(&closes, b.window, b.multiplier, b.estimator);
        columns.push((BB_UPPER_COLUMN.to_string(), bands.upper));
        columns.push((BB_LOWER_COLUMN.to_string(), bands.lower));
    }

    let mut table = IndicatorTable::new(series);
    for (name, values) in columns {
        if let Err(e) = table.push_column(name, values) {
            tracing::error!(ticker = %table.ticker, error = %e, "Dropped malformed indicator column");
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tadash_core::{Bar, Ticker};

    fn series_from(closes: &[Decimal]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar::close_only(start + Days::new(i as u64), *c))
            .collect();
        PriceSeries::new(Ticker::parse("TEST3.SA").unwrap(), bars)
    }

    #[test]
    fn test_every_column_matches_row_count() {
        let closes: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        let table = build_table(series_from(&closes), &IndicatorSet::full());
        assert_eq!(table.columns().len(), 7);
        for column in table.columns() {
            assert_eq!(column.values.len(), 30, "column {}", column.name);
        }
        // 30 points: SMA50 never defined, MACD signal never defined
        assert_eq!(table.column("SMA50").unwrap().defined_count(), 0);
        assert_eq!(table.column("MACD_signal").unwrap().defined_count(), 0);
        assert_eq!(table.column("MACD").unwrap().first_defined(), Some(25));
        assert_eq!(table.column("SMA20").unwrap().defined_count(), 11);
    }

    #[test]
    fn test_disabled_indicators_are_omitted() {
        let closes = vec![dec!(10); 5];
        let mut set = IndicatorSet::rsi_and_sma();
        set.sma_windows = vec![3];
        let table = build_table(series_from(&closes), &set);
        let names: Vec<_> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["SMA3", "RSI"]);
    }

    #[test]
    fn test_empty_series_yields_empty_columns() {
        let table = build_table(series_from(&[]), &IndicatorSet::full());
        assert!(table.is_empty());
        assert!(table.columns().iter().all(|c| c.values.is_empty()));
    }
}
