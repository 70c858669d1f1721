use crate::Indicator;
use rust_decimal::Decimal;

/// Exponential Moving Average, `k = 2 / (n + 1)`.
///
/// The first output is the simple mean of the first `n` inputs; every later
/// output follows `ema = (x - prev) * k + prev`. A step that overflows is
/// undefined and leaves the previous value in place; an overflowing seed
/// leaves the EMA unseeded.
#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    smoothing: Decimal,
    current: Option<Decimal>,
    seen: usize,
    seed_sum: Option<Decimal>,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span > 0, "EMA span must be > 0");
        Self {
            span,
            smoothing: Decimal::TWO / Decimal::from(span + 1),
            current: None,
            seen: 0,
            seed_sum: Some(Decimal::ZERO),
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        self.current
    }
}

impl Indicator for Ema {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        match self.current {
            Some(prev) => {
                let step = value
                    .checked_sub(prev)
                    .and_then(|d| d.checked_mul(self.smoothing))
                    .and_then(|d| d.checked_add(prev));
                if step.is_some() {
                    self.current = step;
                }
                step
            }
            None => {
                self.seen += 1;
                self.seed_sum = self.seed_sum.and_then(|sum| sum.checked_add(value));
                if self.seen == self.span {
                    self.current = self.seed_sum.map(|sum| sum / Decimal::from(self.span));
                }
                self.current
            }
        }
    }

    fn reset(&mut self) {
        self.current = None;
        self.seen = 0;
        self.seed_sum = Some(Decimal::ZERO);
    }

    fn period(&self) -> usize {
        self.span
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }
}
