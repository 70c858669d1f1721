pub mod compute;
pub mod config;
pub mod pipeline;

pub use compute::build_table;
pub use config::{default_end_date, default_start_date, BollingerParams, ConfigError, IndicatorSet, MacdParams, RsiParams};
pub use pipeline::{IndicatorPipeline, TickerOutcome};
