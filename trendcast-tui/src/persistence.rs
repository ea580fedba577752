//! App state persistence: JSON save/load across restarts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::{AppState, Overlay, Panel};

/// Serializable subset of app state that persists across restarts.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub last_ticker: Option<String>,
    pub horizon_years: Option<f64>,
    pub active_panel: Panel,
    pub welcome_dismissed: bool,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            last_ticker: None,
            horizon_years: None,
            active_panel: Panel::Select,
            welcome_dismissed: false,
        }
    }
}

/// Load persisted state from disk. Returns defaults if file is missing or corrupt.
pub fn load(path: &Path) -> PersistedState {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => PersistedState::default(),
    }
}

/// Save persisted state to disk. Creates parent directories if needed.
pub fn save(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn extract(app: &AppState) -> PersistedState {
    PersistedState {
        last_ticker: app.select.selected().map(|t| t.to_string()),
        horizon_years: Some(app.select.years),
        active_panel: app.active_panel,
        welcome_dismissed: app.overlay != Overlay::Welcome,
    }
}

/// Apply persisted state. Values the current config no longer allows are dropped.
pub fn apply(app: &mut AppState, state: PersistedState) {
    if let Some(ticker) = &state.last_ticker {
        if !app.select.select(ticker) {
            tracing::debug!(ticker = %ticker, "persisted ticker no longer configured");
        }
    }
    if let Some(years) = state.horizon_years.filter(|y| y.is_finite()) {
        app.select.years = app.config.horizon.snap(years);
    }
    app.active_panel = state.active_panel;
    if !state.welcome_dismissed {
        app.overlay = Overlay::Welcome;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let state = PersistedState {
            last_ticker: Some("MSFT".into()),
            horizon_years: Some(3.0),
            active_panel: Panel::Chart,
            welcome_dismissed: true,
        };
        save(&path, &state).unwrap();
        let loaded = load(&path);

        assert_eq!(loaded.last_ticker.as_deref(), Some("MSFT"));
        assert_eq!(loaded.horizon_years, Some(3.0));
        assert_eq!(loaded.active_panel, Panel::Chart);
        assert!(loaded.welcome_dismissed);
    }

    #[test]
    fn missing_file_returns_defaults() {
        let loaded = load(Path::new("/nonexistent/path/state.json"));
        assert!(loaded.last_ticker.is_none());
        assert!(!loaded.welcome_dismissed);
    }

    #[test]
    fn corrupt_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not valid json {{{").unwrap();

        let loaded = load(&path);
        assert!(loaded.last_ticker.is_none());
        assert_eq!(loaded.active_panel, Panel::Select);
    }

    #[test]
    fn apply_restores_selection_and_snaps_horizon() {
        let (mut app, _rx, _tx) = test_app();
        apply(
            &mut app,
            PersistedState {
                last_ticker: Some("MSFT".into()),
                horizon_years: Some(99.0),
                active_panel: Panel::Forecast,
                welcome_dismissed: false,
            },
        );
        assert_eq!(app.select.selected().unwrap().as_str(), "MSFT");
        assert_eq!(app.select.years, app.config.horizon.max_years);
        assert_eq!(app.active_panel, Panel::Forecast);
        assert_eq!(app.overlay, Overlay::Welcome);

        let back = extract(&app);
        assert_eq!(back.last_ticker.as_deref(), Some("MSFT"));
        assert!(!back.welcome_dismissed);
    }

    #[test]
    fn unknown_ticker_keeps_cursor() {
        let (mut app, _rx, _tx) = test_app();
        apply(
            &mut app,
            PersistedState {
                last_ticker: Some("ZZZZ".into()),
                ..PersistedState::default()
            },
        );
        assert_eq!(app.select.cursor, 0);
    }
}
