use crate::ema::Ema;
use crate::Indicator;
use rust_decimal::Decimal;

/// MACD (Moving Average Convergence Divergence).
///
/// Composed of three EMAs:
/// - Fast EMA (default 12)
/// - Slow EMA (default 26)
/// - Signal EMA (default 9), fed with the MACD line once it exists
///
/// The MACD line is defined from the `slow`-th input; the signal line needs
/// `signal - 1` further inputs on top of that.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_ema: Ema,
    slow_ema: Ema,
    signal_ema: Ema,
    last: Option<MacdOutput>,
}

/// One MACD point. `signal` lags behind `macd` while the signal EMA seeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub macd: Decimal,
    pub signal: Option<Decimal>,
}

impl MacdOutput {
    pub fn histogram(&self) -> Option<Decimal> {
        self.signal.map(|s| self.macd - s)
    }
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast < slow, "Fast period must be less than slow period");
        Self {
            fast_ema: Ema::new(fast),
            slow_ema: Ema::new(slow),
            signal_ema: Ema::new(signal),
            last: None,
        }
    }

    /// Standard MACD (12, 26, 9).
    pub fn default_periods() -> Self {
        Self::new(12, 26, 9)
    }

    pub fn output(&self) -> Option<MacdOutput> {
        self.last
    }

    /// Process next value and return the MACD point if the line is defined.
    /// A point whose EMAs overflow is undefined.
    pub fn next_output(&mut self, value: Decimal) -> Option<MacdOutput> {
        let fast = self.fast_ema.next(value);
        let slow = self.slow_ema.next(value);

        self.last = match (fast, slow) {
            (Some(f), Some(s)) => f.checked_sub(s).map(|macd| MacdOutput {
                macd,
                signal: self.signal_ema.next(macd),
            }),
            _ => None,
        };
        self.last
    }
}

impl Indicator for Macd {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        self.next_output(value).map(|o| o.macd)
    }

    fn reset(&mut self) {
        self.fast_ema.reset();
        self.slow_ema.reset();
        self.signal_ema.reset();
        self.last = None;
    }

    fn period(&self) -> usize {
        self.slow_ema.period()
    }

    fn is_ready(&self) -> bool {
        self.last.is_some()
    }
}
