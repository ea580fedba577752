//! Panel 3: Chart. Open and close prices with a zoomable range window.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use crate::app::AppState;
use crate::theme;
use crate::ui::plot::{price_traces, x_label, Bounds, PriceTraces};
use crate::ui::render_message;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chart = &app.chart;
    match price_traces(
        app.outcome.as_ref(),
        chart.window,
        chart.show_open,
        chart.show_close,
    ) {
        Ok(traces) => render_chart(f, area, app, &traces),
        Err(why) => render_message(f, area, &why.to_string()),
    }
}

fn render_chart(f: &mut Frame, area: Rect, app: &AppState, traces: &PriceTraces) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let (start, end, total) = traces.shown;
    let range = if app.chart.window.is_full() {
        "full range".to_string()
    } else {
        format!("points {}..{} of {total}", start + 1, end)
    };
    let header = Line::from(vec![
        Span::styled("Time Series data  ", theme::accent_bold()),
        Span::styled(range, theme::muted()),
        Span::styled(
            "  [+/-]zoom [h/l]pan [0]reset [o]pen [c]lose",
            theme::muted(),
        ),
    ]);
    f.render_widget(Paragraph::new(header), chunks[0]);

    let mut datasets = Vec::new();
    if !traces.open.is_empty() {
        datasets.push(
            Dataset::default()
                .name("stock_open")
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(theme::NEUTRAL))
                .graph_type(GraphType::Line)
                .data(&traces.open),
        );
    }
    if !traces.close.is_empty() {
        datasets.push(
            Dataset::default()
                .name("stock_close")
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(theme::POSITIVE))
                .graph_type(GraphType::Line)
                .data(&traces.close),
        );
    }

    let chart = Chart::new(datasets)
        .x_axis(date_axis(traces.bounds))
        .y_axis(price_axis(traces.bounds, "Price"));
    f.render_widget(chart, chunks[1]);
}

/// Date x axis labelled at both ends and the midpoint.
pub fn date_axis<'a>(bounds: Bounds) -> Axis<'a> {
    let [lo, hi] = bounds.x;
    Axis::default()
        .style(theme::muted())
        .bounds(bounds.x)
        .labels(vec![
            Span::styled(x_label(lo), theme::muted()),
            Span::styled(x_label((lo + hi) / 2.0), theme::muted()),
            Span::styled(x_label(hi), theme::muted()),
        ])
}

pub fn price_axis<'a>(bounds: Bounds, title: &'a str) -> Axis<'a> {
    let [lo, hi] = bounds.y;
    Axis::default()
        .title(Span::styled(title, theme::muted()))
        .style(theme::muted())
        .bounds(bounds.y)
        .labels(vec![
            Span::styled(format!("{lo:.2}"), theme::muted()),
            Span::styled(format!("{hi:.2}"), theme::muted()),
        ])
}
