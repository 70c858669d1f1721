use crate::Indicator;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Simple Moving Average: the mean of the last `window` inputs.
///
/// The window total is re-summed with checked arithmetic on each input. A
/// window whose total does not fit in a `Decimal` reads as undefined.
#[derive(Debug, Clone)]
pub struct Sma {
    window: usize,
    values: VecDeque<Decimal>,
    total: Option<Decimal>,
}

impl Sma {
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "SMA window must be > 0");
        Self {
            window,
            values: VecDeque::with_capacity(window),
            total: Some(Decimal::ZERO),
        }
    }

    /// The trailing window, oldest first.
    pub fn window_values(&self) -> impl Iterator<Item = &Decimal> {
        self.values.iter()
    }

    /// Sum of the current window, `None` on overflow.
    pub fn total(&self) -> Option<Decimal> {
        self.total
    }

    pub fn value(&self) -> Option<Decimal> {
        if !self.is_ready() {
            return None;
        }
        self.total?.checked_div(Decimal::from(self.window))
    }
}

impl Indicator for Sma {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        if self.values.len() == self.window {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.total = self
            .values
            .iter()
            .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v));
        self.value()
    }

    fn reset(&mut self) {
        self.values.clear();
        self.total = Some(Decimal::ZERO);
    }

    fn period(&self) -> usize {
        self.window
    }

    fn is_ready(&self) -> bool {
        self.values.len() == self.window
    }
}
