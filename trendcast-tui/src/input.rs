//! Keyboard input dispatch: overlays first, then global keys, then the active panel.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{AppState, Overlay, Panel};

pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Windows sends both Press and Release.
    if key.kind != KeyEventKind::Press {
        return;
    }

    // 1. Overlays consume input first.
    match app.overlay {
        Overlay::Welcome => {
            app.overlay = Overlay::None;
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::None => {}
    }

    // 2. Global keys.
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char(c @ '1'..='6') => {
            let idx = c as usize - '1' as usize;
            if let Some(panel) = Panel::from_index(idx) {
                app.active_panel = panel;
            }
            return;
        }
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.active_panel = app.active_panel.prev();
            } else {
                app.active_panel = app.active_panel.next();
            }
            return;
        }
        KeyCode::BackTab => {
            app.active_panel = app.active_panel.prev();
            return;
        }
        KeyCode::Char('e') => {
            app.overlay = Overlay::ErrorHistory;
            app.error_scroll = 0;
            return;
        }
        _ => {}
    }

    // 3. Panel-specific keys.
    match app.active_panel {
        Panel::Select => handle_select_key(app, key),
        Panel::Data => handle_data_key(app, key),
        Panel::Chart => handle_chart_key(app, key),
        Panel::Forecast | Panel::Components | Panel::Help => {}
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

/// Every change of ticker or horizon reruns the pipeline.
fn handle_select_key(app: &mut AppState, key: KeyEvent) {
    let count = app.select.tickers.len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.select.cursor + 1 < count {
                app.select.cursor += 1;
                app.request_run();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if app.select.cursor > 0 {
                app.select.cursor -= 1;
                app.request_run();
            }
        }
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
            step_horizon(app, 1);
        }
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('-') => {
            step_horizon(app, -1);
        }
        KeyCode::Enter => app.request_run(),
        KeyCode::Char('r') => app.refresh(),
        _ => {}
    }
}

fn step_horizon(app: &mut AppState, direction: i32) {
    let slider = &app.config.horizon;
    let years = if direction > 0 {
        slider.step_up(app.select.years)
    } else {
        slider.step_down(app.select.years)
    };
    if years != app.select.years {
        app.select.years = years;
        app.request_run();
    }
}

fn handle_data_key(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            app.data_scroll = app.data_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.data_scroll = app.data_scroll.saturating_sub(1);
        }
        KeyCode::Char('g') | KeyCode::Home => app.data_scroll = 0,
        _ => {}
    }
}

fn handle_chart_key(app: &mut AppState, key: KeyEvent) {
    let n = app.series_len();
    let chart = &mut app.chart;
    match key.code {
        KeyCode::Char('+') | KeyCode::Char('=') => chart.window.zoom_in(n),
        KeyCode::Char('-') => chart.window.zoom_out(n),
        KeyCode::Char('h') | KeyCode::Left => chart.window.pan_back(n),
        KeyCode::Char('l') | KeyCode::Right => chart.window.pan_forward(n),
        KeyCode::Char('0') => chart.window.reset(),
        KeyCode::Char('o') => chart.show_open = !chart.show_open,
        KeyCode::Char('c') => chart.show_close = !chart.show_close,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{series, test_app};
    use crate::worker::WorkerCommand;
    use trendcast_runner::PipelineOutcome;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn number_keys_switch_panels() {
        let (mut app, _rx, _tx) = test_app();
        handle_key(&mut app, press(KeyCode::Char('3')));
        assert_eq!(app.active_panel, Panel::Chart);
        handle_key(&mut app, press(KeyCode::Char('6')));
        assert_eq!(app.active_panel, Panel::Help);
        handle_key(&mut app, press(KeyCode::Tab));
        assert_eq!(app.active_panel, Panel::Select);
        handle_key(&mut app, press(KeyCode::BackTab));
        assert_eq!(app.active_panel, Panel::Help);
    }

    #[test]
    fn welcome_swallows_first_key() {
        let (mut app, _rx, _tx) = test_app();
        app.overlay = Overlay::Welcome;
        handle_key(&mut app, press(KeyCode::Char('q')));
        assert!(app.running);
        assert_eq!(app.overlay, Overlay::None);
        handle_key(&mut app, press(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[test]
    fn ticker_change_reruns_pipeline() {
        let (mut app, rx, _tx) = test_app();
        handle_key(&mut app, press(KeyCode::Char('j')));
        match rx.try_recv().unwrap() {
            WorkerCommand::Run { ticker, .. } => {
                assert_eq!(Some(&ticker), app.select.selected());
            }
            other => panic!("expected Run, got {other:?}"),
        }

        // top of the list: no move, no run
        app.select.cursor = 0;
        handle_key(&mut app, press(KeyCode::Char('k')));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn horizon_steps_and_clamps() {
        let (mut app, rx, _tx) = test_app();
        let slider = app.config.horizon;
        app.select.years = slider.max_years;
        handle_key(&mut app, press(KeyCode::Char('l')));
        assert_eq!(app.select.years, slider.max_years);
        assert!(rx.try_recv().is_err());

        handle_key(&mut app, press(KeyCode::Char('h')));
        assert_eq!(app.select.years, slider.step_down(slider.max_years));
        match rx.try_recv().unwrap() {
            WorkerCommand::Run { horizon, .. } => {
                assert_eq!(horizon.years(), app.select.years);
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn refresh_invalidates_then_runs() {
        let (mut app, rx, _tx) = test_app();
        handle_key(&mut app, press(KeyCode::Char('r')));
        assert!(matches!(
            rx.try_recv().unwrap(),
            WorkerCommand::Invalidate { .. }
        ));
        assert!(matches!(rx.try_recv().unwrap(), WorkerCommand::Run { .. }));
    }

    #[test]
    fn chart_keys_drive_range_window() {
        let (mut app, _rx, _tx) = test_app();
        app.outcome = Some(PipelineOutcome::ForecastFailed {
            series: series(100),
            error: trendcast_core::forecast::FitError::ConstantSeries,
        });
        app.active_panel = Panel::Chart;

        handle_key(&mut app, press(KeyCode::Char('+')));
        assert_eq!(app.chart.window.bounds(100), (50, 100));
        handle_key(&mut app, press(KeyCode::Char('h')));
        assert_eq!(app.chart.window.bounds(100), (38, 88));
        handle_key(&mut app, press(KeyCode::Char('0')));
        assert!(app.chart.window.is_full());

        handle_key(&mut app, press(KeyCode::Char('o')));
        assert!(!app.chart.show_open);
        assert!(app.chart.show_close);
    }

    #[test]
    fn error_overlay_scrolls_within_history() {
        let (mut app, _rx, _tx) = test_app();
        for i in 0..3 {
            app.push_error(crate::app::ErrorCategory::Data, format!("e{i}"), String::new());
        }
        handle_key(&mut app, press(KeyCode::Char('e')));
        assert_eq!(app.overlay, Overlay::ErrorHistory);
        for _ in 0..5 {
            handle_key(&mut app, press(KeyCode::Char('j')));
        }
        assert_eq!(app.error_scroll, 2);
        handle_key(&mut app, press(KeyCode::Esc));
        assert_eq!(app.overlay, Overlay::None);
    }
}
