//! `tadash.toml` loading. Every section is optional; CLI flags are applied on
//! top of whatever the file provides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tadash_data::yahoo::DEFAULT_BASE_URL;
use tadash_engine::IndicatorSet;

pub const DEFAULT_CONFIG_FILE: &str = "tadash.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    /// Directory of `<TICKER>.csv` files, used by the `csv` provider.
    pub data_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Yahoo,
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from("data"),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cached ranges kept in memory; 0 disables caching.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 128 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub indicators: IndicatorSet,
    pub server: ServerConfig,
    pub symbols_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load an explicit file, or `tadash.toml` from the working directory if
    /// present, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.provider.kind, ProviderKind::Yahoo);
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.pipeline.concurrency, 4);
        assert_eq!(config.indicators, IndicatorSet::full());
        assert!(config.symbols_file.is_none());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tadash.toml");
        std::fs::write(
            &path,
            r#"
            symbols_file = "symbols.csv"

            [provider]
            kind = "csv"
            data_dir = "/var/lib/tadash"

            [cache]
            capacity = 0

            [indicators]
            sma_windows = [10]

            [indicators.bollinger]
            multiplier = 1.5
            "#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Csv);
        assert_eq!(config.provider.data_dir, PathBuf::from("/var/lib/tadash"));
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.cache.capacity, 0);
        assert_eq!(config.indicators.sma_windows, vec![10]);
        assert_eq!(config.indicators.bollinger.multiplier, dec!(1.5));
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.symbols_file, Some(PathBuf::from("symbols.csv")));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_unknown_provider_kind_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tadash.toml");
        std::fs::write(&path, "[provider]\nkind = \"bloomberg\"\n").unwrap();
        assert!(AppConfig::from_file(&path).is_err());
    }
}
