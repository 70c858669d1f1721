pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod series;
pub mod sma;

use rust_decimal::Decimal;

/// Trait for streaming (incremental) indicators.
/// Feed one close at a time; `None` means the lookback window is not filled yet.
pub trait Indicator: Send + Sync {
    /// Process the next value and return the indicator output (if defined).
    fn next(&mut self, value: Decimal) -> Option<Decimal>;

    /// Reset the indicator to its initial state.
    fn reset(&mut self);

    /// The number of inputs consumed before the first output.
    fn period(&self) -> usize;

    /// Whether the indicator currently produces output.
    fn is_ready(&self) -> bool;
}
