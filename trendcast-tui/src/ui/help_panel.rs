//! Panel 6: Help. Keyboard shortcuts.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = Vec::new();

    section(&mut lines, "Global Navigation");
    key(&mut lines, "1-6", "Switch to panel by number");
    key(&mut lines, "Tab / Shift+Tab", "Cycle panels forward / back");
    key(&mut lines, "e", "Open error history overlay");
    key(&mut lines, "q", "Quit");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 1: Select");
    key(&mut lines, "j / k", "Next / previous ticker (runs the forecast)");
    key(&mut lines, "h / l  - / +", "Shorter / longer horizon (runs the forecast)");
    key(&mut lines, "Enter", "Run forecast for the current selection");
    key(&mut lines, "r", "Drop the cached series and refetch");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 2: Data");
    key(&mut lines, "j / k", "Scroll tables");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 3: Chart");
    key(&mut lines, "+ / -", "Zoom in / out");
    key(&mut lines, "h / l", "Pan older / newer");
    key(&mut lines, "0", "Show full range");
    key(&mut lines, "o / c", "Toggle open / close trace");
    lines.push(Line::from(""));

    section(&mut lines, "Panels 4-5: Forecast, Components");
    key(&mut lines, "", "Charts for the last completed run");
    lines.push(Line::from(""));

    let slider = &app.config.horizon;
    section(&mut lines, "Horizon");
    key(
        &mut lines,
        "Range",
        &format!(
            "{} to {} years in steps of {}",
            slider.min_years, slider.max_years, slider.step_years
        ),
    );
    key(
        &mut lines,
        "History",
        &format!("fetched from {}", app.config.start_date_policy.floor()),
    );

    let para = Paragraph::new(lines);
    f.render_widget(para, area);
}

fn section<'a>(lines: &mut Vec<Line<'a>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key<'a>(lines: &mut Vec<Line<'a>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {:>20}  ", keys), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}
