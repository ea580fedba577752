//! Panel 1: Select. Ticker list and forecast horizon slider.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use trendcast_core::domain::DAYS_PER_YEAR;

use crate::app::AppState;
use crate::theme;
use crate::ui::widgets::Slider;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(area);

    let hints = Line::from(Span::styled(
        "[j/k]ticker [h/l]horizon [Enter]run [r]efresh",
        theme::muted(),
    ));
    f.render_widget(Paragraph::new(hints), chunks[0]);

    render_horizon(f, chunks[1], app);
    render_tickers(f, chunks[2], app);
}

fn render_horizon(f: &mut Frame, area: Rect, app: &AppState) {
    let slider_cfg = &app.config.horizon;
    let years = app.select.years;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let slider = Slider::new(
        "Years of prediction:",
        slider_cfg.min_years,
        slider_cfg.max_years,
        years,
    )
    .unit("y")
    .focused(true);
    f.render_widget(slider, rows[0]);

    let days = (years * DAYS_PER_YEAR).round() as usize;
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!("  {days} days ahead"),
            theme::muted(),
        ))),
        rows[1],
    );
}

fn render_tickers(f: &mut Frame, area: Rect, app: &AppState) {
    let select = &app.select;
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        "Select dataset for prediction",
        theme::accent_bold(),
    )));

    for (i, ticker) in select.tickers.iter().enumerate() {
        let is_cursor = i == select.cursor;
        let is_loaded = app.outcome_ticker.as_ref() == Some(ticker);

        let style = if is_cursor {
            theme::accent().add_modifier(Modifier::REVERSED)
        } else {
            theme::neutral()
        };
        let marker = if is_cursor { "▸ " } else { "  " };
        let mut spans = vec![
            Span::raw(marker),
            Span::styled(format!("{:<8}", ticker.as_str()), style),
        ];
        if is_loaded {
            let (dot, dot_style) = match &app.outcome {
                Some(o) if o.is_ready() => (" ●", theme::positive()),
                Some(o) if o.is_no_data() => (" ✗", theme::negative()),
                Some(_) => (" ●", theme::warning()),
                None => (" ○", theme::muted()),
            };
            spans.push(Span::styled(dot, dot_style));
        }
        lines.push(Line::from(spans));
    }

    if select.tickers.is_empty() {
        lines.push(Line::from(Span::styled(
            "No tickers configured.",
            theme::warning(),
        )));
    }

    f.render_widget(Paragraph::new(lines), area);
}
