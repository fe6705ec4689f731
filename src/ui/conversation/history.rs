//! Conversation transcript display component

use crate::events::Sender;
use crate::ui::conversation::view::MessageView;
use crate::ui::text::wrap_text;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const STREAMING_CURSOR: &str = "▋";

/// Build the wrapped lines for every message, including blank spacers
pub fn transcript_lines(
    messages: &[MessageView],
    width: u16,
    show_timestamps: bool,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        lines.extend(message_lines(message, width, show_timestamps));
        lines.push(Line::from(""));
    }
    lines
}

fn message_lines(message: &MessageView, width: u16, show_timestamps: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let role_icon = match message.sender {
        Sender::User => "👤",
        Sender::Ai => "🤖",
    };
    let mut header = format!("{} {}", role_icon, message.sender.display_name());
    if show_timestamps {
        header.push(' ');
        header.push_str(&message.timestamp);
    }
    header.push(' ');
    header.push_str(&"─".repeat(20));
    lines.push(Line::from(vec![Span::styled(
        header,
        Style::default().fg(Color::DarkGray),
    )]));

    let content_style = content_style(message.sender);
    let content_lines = wrap_text(&message.text, width.saturating_sub(2) as usize);
    let last_index = content_lines.len().saturating_sub(1);
    for (i, content_line) in content_lines.into_iter().enumerate() {
        let mut spans = vec![Span::raw("  "), Span::styled(content_line, content_style)];
        if message.streaming && i == last_index {
            spans.push(Span::styled(
                STREAMING_CURSOR,
                Style::default().fg(Color::Yellow),
            ));
        }
        lines.push(Line::from(spans));
    }

    lines
}

fn content_style(sender: Sender) -> Style {
    match sender {
        Sender::User => Style::default().fg(Color::Blue),
        Sender::Ai => Style::default().fg(Color::Green),
    }
}

/// Bordered transcript showing `lines` from `offset` downwards
pub struct ConversationHistory<'a> {
    lines: &'a [Line<'static>],
    offset: usize,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(lines: &'a [Line<'static>], offset: usize) -> Self {
        Self { lines, offset }
    }

    pub fn block() -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .title("💬 Conversation")
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Self::block();
        let inner_area = block.inner(area);
        block.render(area, buf);

        let visible = self
            .lines
            .iter()
            .skip(self.offset)
            .take(inner_area.height as usize);
        for (i, line) in visible.enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}
