use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Animated "thinking" line shown while a reply is pending
#[derive(Debug, Clone, Copy)]
pub struct LoadingIndicator {
    tick: usize,
}

impl LoadingIndicator {
    pub fn new(tick: usize) -> Self {
        Self { tick }
    }

    pub fn dots(&self) -> &'static str {
        match self.tick % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        }
    }
}

impl Widget for LoadingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        let indicator = Line::from(vec![
            Span::styled("AI ", Style::default().fg(Color::Blue)),
            Span::styled("is thinking", Style::default().fg(Color::Gray)),
            Span::styled(self.dots(), Style::default().fg(Color::Yellow)),
        ]);
        buf.set_line(area.x, area.y, &indicator, area.width);
    }
}
