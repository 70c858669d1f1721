use crate::Indicator;
use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const MIDPOINT: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Relative Strength Index.
///
/// The first average gain/loss is the simple mean of the first `window`
/// close-to-close changes; later averages use Wilder's smoothing. A window
/// without any movement reads 50, one without losses reads 100.
#[derive(Debug, Clone)]
pub struct Rsi {
    window: usize,
    prev_close: Option<Decimal>,
    changes: usize,
    gain_sum: Option<Decimal>,
    loss_sum: Option<Decimal>,
    avg_gain: Option<Decimal>,
    avg_loss: Option<Decimal>,
}

impl Rsi {
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "RSI window must be > 0");
        Self {
            window,
            prev_close: None,
            changes: 0,
            gain_sum: Some(Decimal::ZERO),
            loss_sum: Some(Decimal::ZERO),
            avg_gain: None,
            avg_loss: None,
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        let (gain, loss) = (self.avg_gain?, self.avg_loss?);
        Some(rsi_from_averages(gain, loss))
    }

    fn smooth(&self, prev: Decimal, x: Decimal) -> Decimal {
        let n = Decimal::from(self.window);
        match prev
            .checked_mul(n - Decimal::ONE)
            .and_then(|p| p.checked_add(x))
        {
            Some(total) => total / n,
            // same average, computed without the scaled intermediate
            None => prev + (x - prev) / n,
        }
    }
}

/// `100 - 100 / (1 + gain / loss)` with the zero-loss cases pinned.
fn rsi_from_averages(gain: Decimal, loss: Decimal) -> Decimal {
    if loss.is_zero() {
        return if gain.is_zero() { MIDPOINT } else { HUNDRED };
    }
    match gain.checked_div(loss).and_then(|rs| rs.checked_add(Decimal::ONE)) {
        Some(denominator) => HUNDRED - HUNDRED / denominator,
        None => HUNDRED,
    }
}

impl Indicator for Rsi {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        if let Some(prev) = self.prev_close.replace(value) {
            let Some(change) = value.checked_sub(prev) else {
                return None;
            };
            let gain = change.max(Decimal::ZERO);
            let loss = (-change).max(Decimal::ZERO);

            match (self.avg_gain, self.avg_loss) {
                (Some(ag), Some(al)) => {
                    self.avg_gain = Some(self.smooth(ag, gain));
                    self.avg_loss = Some(self.smooth(al, loss));
                }
                _ => {
                    self.changes += 1;
                    self.gain_sum = self.gain_sum.and_then(|sum| sum.checked_add(gain));
                    self.loss_sum = self.loss_sum.and_then(|sum| sum.checked_add(loss));
                    if self.changes == self.window {
                        let n = Decimal::from(self.window);
                        // an overflowing seed leaves the RSI undefined
                        self.avg_gain = self.gain_sum.map(|sum| sum / n);
                        self.avg_loss = self.loss_sum.map(|sum| sum / n);
                    }
                }
            }
        }

        self.value()
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.changes = 0;
        self.gain_sum = Some(Decimal::ZERO);
        self.loss_sum = Some(Decimal::ZERO);
        self.avg_gain = None;
        self.avg_loss = None;
    }

    fn period(&self) -> usize {
        // one extra close for the first change
        self.window + 1
    }

    fn is_ready(&self) -> bool {
        self.avg_gain.is_some()
    }
}
