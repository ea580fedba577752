//! Panel 2: Data. Raw price table head/tail and the forecast tail.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use trendcast_runner::{render_forecast_tail, render_series_table, PipelineOutcome};

use crate::app::AppState;
use crate::theme;
use crate::ui::plot::RenderPrecondition;
use crate::ui::render_message;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(outcome) = &app.outcome else {
        render_message(f, area, &RenderPrecondition::NotLoaded.to_string());
        return;
    };

    let lines = panel_lines(app, outcome);
    let para = Paragraph::new(lines).scroll((app.data_scroll.min(u16::MAX as usize) as u16, 0));
    f.render_widget(para, area);
}

fn panel_lines<'a>(app: &AppState, outcome: &'a PipelineOutcome) -> Vec<Line<'a>> {
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(vec![
        Span::styled("Status: ", theme::muted()),
        Span::styled(
            outcome.load_status(),
            if outcome.is_no_data() {
                theme::negative()
            } else {
                theme::positive()
            },
        ),
        Span::styled("  [j/k]scroll", theme::muted()),
    ]));
    if let Some(series) = outcome.series() {
        lines.push(Line::from(vec![
            Span::styled("Source: ", theme::muted()),
            Span::styled(series.source().label(), theme::accent()),
            Span::styled(
                format!("  {} rows  cache hits: {}", series.len(), app.cache_hits),
                theme::muted(),
            ),
        ]));
    }
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled("Raw data", theme::accent_bold())));
    let table = render_series_table(
        outcome.series().map(|s| s.as_ref()),
        app.config.column_schema,
        app.config.display,
    );
    push_block(&mut lines, &table);
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled("Forecast data", theme::accent_bold())));
    match (outcome.forecast(), outcome.forecast_message()) {
        (Some(result), _) => {
            let tail = render_forecast_tail(result, app.config.display.tail_rows);
            push_block(&mut lines, &tail);
        }
        (None, Some(msg)) => {
            lines.push(Line::from(Span::styled(msg, theme::negative())));
        }
        (None, None) => {}
    }
    lines
}

fn push_block(lines: &mut Vec<Line<'_>>, text: &str) {
    for row in text.lines() {
        lines.push(Line::from(Span::styled(row.to_string(), theme::text())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{series, test_app};
    use trendcast_core::data::FetchError;
    use trendcast_core::domain::TickerSymbol;
    use trendcast_core::forecast::FitError;
    use trendcast_runner::{NO_DATA_FORECAST, NO_DATA_TABLE};

    fn text(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn no_data_shows_both_messages() {
        let (app, _rx, _tx) = test_app();
        let outcome = PipelineOutcome::NoData {
            ticker: TickerSymbol::new("NOPE").unwrap(),
            reason: FetchError::SymbolNotFound {
                symbol: "NOPE".into(),
            },
        };
        let out = text(&panel_lines(&app, &outcome));
        assert!(out.contains("Loading data... failed!"));
        assert!(out.contains(NO_DATA_TABLE));
        assert!(out.contains(NO_DATA_FORECAST));
    }

    #[test]
    fn failed_fit_still_lists_raw_rows() {
        let (app, _rx, _tx) = test_app();
        let outcome = PipelineOutcome::ForecastFailed {
            series: series(20),
            error: FitError::ConstantSeries,
        };
        let out = text(&panel_lines(&app, &outcome));
        assert!(out.contains("2023-01-01"));
        assert!(out.contains("..."));
        assert!(out.contains("Error during forecasting"));
    }
}
