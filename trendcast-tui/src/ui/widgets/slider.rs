//! Labeled horizontal slider widget.
//!
//! Used by the Select panel for the forecast horizon.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

use crate::theme;

/// `label  min ━━━━━●───── max  value`
pub struct Slider<'a> {
    label: &'a str,
    min: f64,
    max: f64,
    value: f64,
    unit: &'a str,
    focused: bool,
}

impl<'a> Slider<'a> {
    pub fn new(label: &'a str, min: f64, max: f64, value: f64) -> Self {
        Self {
            label,
            min,
            max,
            value,
            unit: "",
            focused: false,
        }
    }

    pub fn unit(mut self, unit: &'a str) -> Self {
        self.unit = unit;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Knob position in `0..width` cells.
    pub fn knob_position(&self, width: usize) -> usize {
        if width == 0 {
            return 0;
        }
        let span = self.max - self.min;
        let frac = if span > 0.0 {
            ((self.value - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        ((width - 1) as f64 * frac).round() as usize
    }
}

impl Widget for Slider<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let label = format!("{} ", self.label);
        let lo = format!("{} ", fmt_value(self.min));
        let hi = format!(" {}", fmt_value(self.max));
        let val = format!("  {}{}", fmt_value(self.value), self.unit);
        let fixed = label.len() + lo.len() + hi.len() + val.len();
        let track = (area.width as usize).saturating_sub(fixed).max(3);
        let knob = self.knob_position(track);

        let filled_style = if self.focused {
            theme::accent()
        } else {
            theme::muted()
        };
        let mut spans = vec![
            Span::styled(label, theme::text()),
            Span::styled(lo, theme::muted()),
            Span::styled("━".repeat(knob), filled_style),
            Span::styled("●", theme::accent_bold()),
            Span::styled("─".repeat(track - knob - 1), Style::default()),
            Span::styled(hi, theme::muted()),
        ];
        spans.push(Span::styled(val, theme::accent_bold()));
        Line::from(spans).render(area, buf);
    }
}

fn fmt_value(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}
