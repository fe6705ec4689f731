use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// One-line "waiting for reply" indicator. The animation frame comes from
/// the caller's tick so identical input renders identically.
pub struct StreamingIndicator<'a> {
    model: &'a str,
    tick: u64,
}

impl<'a> StreamingIndicator<'a> {
    pub fn new(model: &'a str, tick: u64) -> Self {
        Self { model, tick }
    }

    fn dots(&self) -> &'static str {
        match self.tick % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        }
    }
}

impl Widget for StreamingIndicator<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let indicator = Line::from(vec![
            Span::styled("🤖 ", Style::default().fg(Color::Green)),
            Span::styled(
                format!("{} is responding", self.model),
                Style::default().fg(Color::Green),
            ),
            Span::styled(self.dots(), Style::default().fg(Color::Yellow)),
        ]);
        buf.set_line(area.x, area.y, &indicator, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_cycle_with_tick() {
        let frames: Vec<&str> = (0..5).map(|t| StreamingIndicator::new("m", t).dots()).collect();
        assert_eq!(frames, vec![".", "..", "...", "   ", "."]);
    }

    #[test]
    fn zero_height_area_is_left_untouched() {
        let area = Rect::new(0, 0, 10, 0);
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 1));
        StreamingIndicator::new("m", 0).render(area, &mut buf);
        assert_eq!(buf, Buffer::empty(Rect::new(0, 0, 10, 1)));
    }
}
