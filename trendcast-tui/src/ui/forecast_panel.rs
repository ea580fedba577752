//! Panel 4: Forecast. Observed close against prediction and its interval.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use crate::app::AppState;
use crate::theme;
use crate::ui::chart_panel::{date_axis, price_axis};
use crate::ui::plot::{forecast_traces, x_label, ForecastTraces};
use crate::ui::render_message;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    match forecast_traces(app.outcome.as_ref()) {
        Ok(traces) => render_chart(f, area, app, &traces),
        Err(why) => render_message(f, area, &why.to_string()),
    }
}

fn render_chart(f: &mut Frame, area: Rect, app: &AppState, traces: &ForecastTraces) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let mut header = vec![Span::styled("Forecast plot", theme::accent_bold())];
    if let Some(h) = app.outcome_horizon {
        header.push(Span::styled(
            format!("  {} days past {}", h.days(), x_label(traces.forecast_start)),
            theme::muted(),
        ));
    }
    if let (Some(&(_, last)), Some(&(_, observed))) =
        (traces.predicted.last(), traces.observed.last())
    {
        let delta = last - observed;
        header.push(Span::styled("  final yhat ", theme::muted()));
        header.push(Span::styled(format!("{last:.2}"), theme::accent()));
        header.push(Span::styled(
            format!(" ({delta:+.2})"),
            theme::change_color(delta),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(header)), chunks[0]);

    // drawn first so the prediction sits on top
    let datasets = vec![
        Dataset::default()
            .name("yhat_lower")
            .marker(symbols::Marker::Braille)
            .style(theme::warning())
            .graph_type(GraphType::Line)
            .data(&traces.lower),
        Dataset::default()
            .name("yhat_upper")
            .marker(symbols::Marker::Braille)
            .style(theme::warning())
            .graph_type(GraphType::Line)
            .data(&traces.upper),
        Dataset::default()
            .name("observed")
            .marker(symbols::Marker::Dot)
            .style(Style::default().fg(theme::TEXT))
            .graph_type(GraphType::Scatter)
            .data(&traces.observed),
        Dataset::default()
            .name("yhat")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(theme::ACCENT))
            .graph_type(GraphType::Line)
            .data(&traces.predicted),
    ];

    let chart = Chart::new(datasets)
        .x_axis(date_axis(traces.bounds))
        .y_axis(price_axis(traces.bounds, "Close"));
    f.render_widget(chart, chunks[1]);
}
