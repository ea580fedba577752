//! Panel 5: Components. Trend and each seasonal term, stacked.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Chart, Dataset, GraphType};
use ratatui::Frame;

use crate::app::AppState;
use crate::theme;
use crate::ui::chart_panel::{date_axis, price_axis};
use crate::ui::plot::{component_traces, ComponentTrace};
use crate::ui::render_message;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let traces = match component_traces(app.outcome.as_ref()) {
        Ok(t) if !t.is_empty() => t,
        Ok(_) => {
            render_message(f, area, "Forecast has no components.");
            return;
        }
        Err(why) => {
            render_message(f, area, &why.to_string());
            return;
        }
    };

    let constraints: Vec<Constraint> = traces
        .iter()
        .map(|_| Constraint::Ratio(1, traces.len() as u32))
        .collect();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (trace, row) in traces.iter().zip(rows.iter()) {
        render_component(f, *row, trace);
    }
}

fn render_component(f: &mut Frame, area: Rect, trace: &ComponentTrace) {
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(theme::muted())
        .title(Span::styled(format!(" {} ", trace.name), theme::accent_bold()));

    let mut datasets = Vec::new();
    if let (Some(lower), Some(upper)) = (&trace.lower, &trace.upper) {
        for (name, data) in [("lower", lower), ("upper", upper)] {
            datasets.push(
                Dataset::default()
                    .name(name)
                    .marker(symbols::Marker::Braille)
                    .style(theme::muted())
                    .graph_type(GraphType::Line)
                    .data(data),
            );
        }
    }
    datasets.push(
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(theme::ACCENT))
            .graph_type(GraphType::Line)
            .data(&trace.points),
    );

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(date_axis(trace.bounds))
        .y_axis(price_axis(trace.bounds, ""));
    f.render_widget(chart, area);
}
