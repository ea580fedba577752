//! TrendCast Runner: configuration and the fetch-then-forecast pipeline.
//!
//! This crate builds on `trendcast-core` to provide:
//! - TOML configuration with named presets and the horizon slider
//! - `Pipeline`: cached fetch, forecast, and a typed outcome per run
//! - CSV/JSON export and the plain-text tables the CLI prints

pub mod config;
pub mod export;
pub mod pipeline;

pub use config::{ConfigError, DisplayConfig, HorizonSlider, PipelineConfig, ProviderKind, PRESETS};
pub use export::{
    export_forecast_csv, export_series_csv, export_summary_json, render_forecast_tail,
    render_series_table, save_artifacts,
};
pub use pipeline::{
    build_provider, Pipeline, PipelineError, PipelineOutcome, RunSummary, NO_DATA_FORECAST,
    NO_DATA_PLOT, NO_DATA_TABLE, STATUS_LOADED, STATUS_LOADING, STATUS_LOAD_FAILED,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn pipeline_is_send() {
        assert_send::<Pipeline>();
    }

    #[test]
    fn outcome_is_send_sync() {
        assert_send::<PipelineOutcome>();
        assert_sync::<PipelineOutcome>();
    }

    #[test]
    fn config_is_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }
}
