use tadash_core::SymbolEntry;
use tadash_engine::IndicatorPipeline;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    pub pipeline: IndicatorPipeline,
    /// Read-only symbol list, loaded once at startup.
    pub symbols: Vec<SymbolEntry>,
}

impl AppState {
    pub fn new(pipeline: IndicatorPipeline, symbols: Vec<SymbolEntry>) -> Self {
        Self { pipeline, symbols }
    }
}
