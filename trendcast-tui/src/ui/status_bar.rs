//! Bottom status bar: panel hints, loading indicator, last status message.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use trendcast_runner::STATUS_LOADING;

use crate::app::{AppState, StatusLevel};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut spans: Vec<Span> = Vec::new();

    spans.push(Span::styled(
        " 1:Select 2:Data 3:Chart 4:Forecast 5:Components 6:Help",
        theme::muted(),
    ));
    spans.push(Span::raw(" | "));

    if app.loading {
        spans.push(Span::styled(STATUS_LOADING, theme::warning()));
        spans.push(Span::raw(" "));
    }

    if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        // the loading text is already shown above
        if !(app.loading && msg.starts_with(STATUS_LOADING)) {
            spans.push(Span::styled(msg.as_str(), style));
        }
    }

    if !app.error_history.is_empty() {
        spans.push(Span::styled(
            format!("  [e]rrors: {}", app.error_history.len()),
            theme::muted(),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
