//! Batch helpers: run a streaming indicator over a whole close series and
//! collect outputs aligned 1:1 with the input.

use crate::bollinger::{BollingerBands, StdDevEstimator};
use crate::macd::Macd;
use crate::rsi::Rsi;
use crate::sma::Sma;
use crate::Indicator;
use rust_decimal::Decimal;

/// An indicator output column; `None` where the lookback is not yet filled.
pub type Column = Vec<Option<Decimal>>;

pub fn run<I: Indicator>(indicator: &mut I, closes: &[Decimal]) -> Column {
    closes.iter().map(|c| indicator.next(*c)).collect()
}

pub fn sma(closes: &[Decimal], window: usize) -> Column {
    run(&mut Sma::new(window), closes)
}

pub fn rsi(closes: &[Decimal], window: usize) -> Column {
    run(&mut Rsi::new(window), closes)
}

pub struct MacdColumns {
    pub macd: Column,
    pub signal: Column,
}

pub fn macd(closes: &[Decimal], fast: usize, slow: usize, signal: usize) -> MacdColumns {
    let mut indicator = Macd::new(fast, slow, signal);
    let (macd, signal): (Column, Column) = closes
        .iter()
        .map(|c| match indicator.next_output(*c) {
            Some(out) => (Some(out.macd), out.signal),
            None => (None, None),
        })
        .unzip();
    MacdColumns { macd, signal }
}

pub struct BollingerColumns {
    pub upper: Column,
    pub middle: Column,
    pub lower: Column,
}

pub fn bollinger(
    closes: &[Decimal],
    window: usize,
    multiplier: Decimal,
    estimator: StdDevEstimator,
) -> BollingerColumns {
    let mut indicator = BollingerBands::new(window, multiplier, estimator);
    let mut columns = BollingerColumns {
        upper: Vec::with_capacity(closes.len()),
        middle: Vec::with_capacity(closes.len()),
        lower: Vec::with_capacity(closes.len()),
    };
    for close in closes {
        let out = indicator.next_output(*close);
        columns.upper.push(out.map(|o| o.upper));
        columns.middle.push(out.map(|o| o.middle));
        columns.lower.push(out.map(|o| o.lower));
    }
    columns
}
