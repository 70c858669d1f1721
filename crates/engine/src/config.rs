use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tadash_indicators::bollinger::StdDevEstimator;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} window must be > 0")]
    ZeroWindow(&'static str),
    #[error("MACD fast period ({fast}) must be less than slow period ({slow})")]
    MacdPeriods { fast: usize, slow: usize },
    #[error("SMA window {0} is listed more than once")]
    DuplicateSmaWindow(usize),
    #[error("Bollinger multiplier must be >= 0, got {0}")]
    NegativeMultiplier(Decimal),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiParams {
    pub enabled: bool,
    pub window: usize,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub enabled: bool,
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            enabled: true,
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerParams {
    pub enabled: bool,
    pub window: usize,
    pub multiplier: Decimal,
    pub estimator: StdDevEstimator,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 20,
            multiplier: Decimal::TWO,
            estimator: StdDevEstimator::Population,
        }
    }
}

/// Which indicators a pipeline computes. Anything not requested is left out
/// of the table entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSet {
    /// One `SMA<n>` column per window; empty disables SMAs.
    pub sma_windows: Vec<usize>,
    pub rsi: RsiParams,
    pub macd: MacdParams,
    pub bollinger: BollingerParams,
    /// Trim leading rows where any requested column is undefined.
    pub drop_incomplete: bool,
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self::full()
    }
}

impl IndicatorSet {
    /// SMA 20/50, RSI 14, MACD 12/26/9, Bollinger 20/2.
    pub fn full() -> Self {
        Self {
            sma_windows: vec![20, 50],
            rsi: RsiParams::default(),
            macd: MacdParams::default(),
            bollinger: BollingerParams::default(),
            drop_incomplete: false,
        }
    }

    /// SMA 20/50 and RSI 14 only.
    pub fn rsi_and_sma() -> Self {
        Self {
            macd: MacdParams {
                enabled: false,
                ..MacdParams::default()
            },
            bollinger: BollingerParams {
                enabled: false,
                ..BollingerParams::default()
            },
            ..Self::full()
        }
    }

    pub fn with_drop_incomplete(mut self, drop_incomplete: bool) -> Self {
        self.drop_incomplete = drop_incomplete;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, window) in self.sma_windows.iter().enumerate() {
            if *window == 0 {
                return Err(ConfigError::ZeroWindow("SMA"));
            }
            if self.sma_windows[..i].contains(window) {
                return Err(ConfigError::DuplicateSmaWindow(*window));
            }
        }

        if self.rsi.enabled && self.rsi.window == 0 {
            return Err(ConfigError::ZeroWindow("RSI"));
        }

        if self.macd.enabled {
            let m = &self.macd;
            if m.fast == 0 || m.slow == 0 || m.signal == 0 {
                return Err(ConfigError::ZeroWindow("MACD"));
            }
            if m.fast >= m.slow {
                return Err(ConfigError::MacdPeriods {
                    fast: m.fast,
                    slow: m.slow,
                });
            }
        }

        if self.bollinger.enabled {
            if self.bollinger.window == 0 {
                return Err(ConfigError::ZeroWindow("Bollinger"));
            }
            if self.bollinger.multiplier < Decimal::ZERO {
                return Err(ConfigError::NegativeMultiplier(self.bollinger.multiplier));
            }
        }

        Ok(())
    }

    /// Names of the derived columns, in table order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sma_windows.iter().map(|w| sma_column(*w)).collect();
        if self.rsi.enabled {
            names.push(RSI_COLUMN.to_string());
        }
        if self.macd.enabled {
            names.push(MACD_COLUMN.to_string());
            names.push(MACD_SIGNAL_COLUMN.to_string());
        }
        if self.bollinger.enabled {
            names.push(BB_UPPER_COLUMN.to_string());
            names.push(BB_LOWER_COLUMN.to_string());
        }
        names
    }
}

pub const RSI_COLUMN: &str = "RSI";
pub const MACD_COLUMN: &str = "MACD";
pub const MACD_SIGNAL_COLUMN: &str = "MACD_signal";
pub const BB_UPPER_COLUMN: &str = "BB_upper";
pub const BB_LOWER_COLUMN: &str = "BB_lower";

pub fn sma_column(window: usize) -> String {
    format!("SMA{}", window)
}

/// Range start used when a caller does not give one.
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

/// Range end used when a caller does not give one: today, UTC.
pub fn default_end_date() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_full_set_columns() {
        assert_eq!(
            IndicatorSet::full().column_names(),
            vec!["SMA20", "SMA50", "RSI", "MACD", "MACD_signal", "BB_upper", "BB_lower"]
        );
        assert!(IndicatorSet::full().validate().is_ok());
    }

    #[test]
    fn test_rsi_and_sma_preset() {
        assert_eq!(
            IndicatorSet::rsi_and_sma().column_names(),
            vec!["SMA20", "SMA50", "RSI"]
        );
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let mut set = IndicatorSet::full();
        set.sma_windows = vec![20, 0];
        assert_eq!(set.validate(), Err(ConfigError::ZeroWindow("SMA")));

        let mut set = IndicatorSet::full();
        set.sma_windows = vec![20, 20];
        assert_eq!(set.validate(), Err(ConfigError::DuplicateSmaWindow(20)));

        let mut set = IndicatorSet::full();
        set.macd.fast = 26;
        assert_eq!(
            set.validate(),
            Err(ConfigError::MacdPeriods { fast: 26, slow: 26 })
        );

        let mut set = IndicatorSet::full();
        set.bollinger.multiplier = dec!(-1);
        assert!(matches!(set.validate(), Err(ConfigError::NegativeMultiplier(_))));
    }

    #[test]
    fn test_disabled_indicator_is_not_validated() {
        let mut set = IndicatorSet::full();
        set.macd = MacdParams {
            enabled: false,
            fast: 0,
            slow: 0,
            signal: 0,
        };
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_default_range() {
        assert_eq!(default_start_date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert!(default_start_date() < default_end_date());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let set: IndicatorSet = toml::from_str(
            r#"
            sma_windows = [9, 21]
            drop_incomplete = true

            [macd]
            enabled = false

            [bollinger]
            estimator = "sample"
            multiplier = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(set.column_names(), vec!["SMA9", "SMA21", "RSI", "BB_upper", "BB_lower"]);
        assert_eq!(set.bollinger.estimator, StdDevEstimator::Sample);
        assert_eq!(set.bollinger.multiplier, dec!(2.5));
        assert_eq!(set.bollinger.window, 20);
        assert_eq!(set.rsi.window, 14);
        assert!(set.drop_incomplete);
    }
}
