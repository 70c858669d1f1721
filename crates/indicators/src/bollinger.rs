use crate::sma::Sma;
use crate::Indicator;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which variance estimator the rolling standard deviation uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdDevEstimator {
    /// Divide by `n`.
    #[default]
    Population,
    /// Divide by `n - 1`.
    Sample,
}

/// Bollinger Bands: the window SMA plus/minus `multiplier` standard deviations.
///
/// `next` returns the middle band; use `next_output` for all three.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    multiplier: Decimal,
    estimator: StdDevEstimator,
    sma: Sma,
    last: Option<BollingerOutput>,
}

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerOutput {
    pub upper: Decimal,
    pub middle: Decimal,
    pub lower: Decimal,
}

impl BollingerOutput {
    pub fn bandwidth(&self) -> Decimal {
        self.upper - self.lower
    }
}

impl BollingerBands {
    pub fn new(window: usize, multiplier: Decimal, estimator: StdDevEstimator) -> Self {
        Self {
            multiplier,
            estimator,
            sma: Sma::new(window),
            last: None,
        }
    }

    /// Standard Bollinger Bands (20, 2, population).
    pub fn default_periods() -> Self {
        Self::new(20, Decimal::TWO, StdDevEstimator::Population)
    }

    /// Rolling σ around `mean`; `None` when the squared deviations overflow.
    fn std_dev(&self, mean: Decimal) -> Option<Decimal> {
        let n = self.sma.period();
        if n < 2 {
            return Some(Decimal::ZERO);
        }
        let squared = self.sma.window_values().try_fold(Decimal::ZERO, |acc, v| {
            let diff = v.checked_sub(mean)?;
            acc.checked_add(diff.checked_mul(diff)?)
        })?;
        let divisor = match self.estimator {
            StdDevEstimator::Population => n,
            StdDevEstimator::Sample => n - 1,
        };
        Some(decimal_sqrt(squared / Decimal::from(divisor)))
    }

    fn bands(&self, middle: Decimal) -> Option<BollingerOutput> {
        let offset = self.multiplier.checked_mul(self.std_dev(middle)?)?;
        Some(BollingerOutput {
            upper: middle.checked_add(offset)?,
            middle,
            lower: middle.checked_sub(offset)?,
        })
    }

    pub fn output(&self) -> Option<BollingerOutput> {
        self.last
    }

    /// Feed one close. `None` until the window fills, and for any point
    /// whose bands do not fit in a `Decimal`.
    pub fn next_output(&mut self, value: Decimal) -> Option<BollingerOutput> {
        let middle = self.sma.next(value);
        self.last = middle.and_then(|m| self.bands(m));
        self.last
    }
}

impl Indicator for BollingerBands {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        self.next_output(value).map(|o| o.middle)
    }

    fn reset(&mut self) {
        self.sma.reset();
        self.last = None;
    }

    fn period(&self) -> usize {
        self.sma.period()
    }

    fn is_ready(&self) -> bool {
        self.sma.is_ready()
    }
}

/// Newton's method square root for Decimal. Non-positive input yields zero.
pub fn decimal_sqrt(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let epsilon = Decimal::new(1, 12);
    let mut guess = if value > Decimal::ONE {
        value / Decimal::TWO
    } else {
        Decimal::ONE
    };
    for _ in 0..100 {
        let next_guess = (guess + value / guess) / Decimal::TWO;
        let diff = (next_guess - guess).abs();
        guess = next_guess;
        if diff < epsilon {
            break;
        }
    }
    guess
}
