use crate::prompts::EXAMPLE_PROMPTS;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Example prompts shown on an empty conversation
pub struct PromptPicker {
    selected: usize,
}

impl PromptPicker {
    pub fn new(selected: usize) -> Self {
        Self { selected }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(vec![Span::styled(
                "Welcome! Ask anything, or pick an example to get started.",
                Style::default().fg(Color::Green),
            )]),
            Line::from(""),
        ];

        for (index, example) in EXAMPLE_PROMPTS.iter().enumerate() {
            let is_selected = index == self.selected;
            let marker = if is_selected { "▶ " } else { "  " };
            let title_style = if is_selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            lines.push(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Cyan)),
                Span::styled(example.title, title_style),
            ]));
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(example.prompt, Style::default().fg(Color::Gray)),
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(vec![Span::styled(
            "↑/↓ to choose, Enter to send. Type to write your own.",
            Style::default().fg(Color::DarkGray),
        )]));
        lines
    }
}

impl Widget for PromptPicker {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("✨ Try an example");
        let inner_area = block.inner(area);
        block.render(area, buf);

        for (i, line) in self.lines().iter().enumerate() {
            if i >= inner_area.height as usize {
                break;
            }
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_prompt_is_marked() {
        let lines = PromptPicker::new(1).lines();
        let marked: Vec<String> = lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .filter(|text| text.starts_with("▶ "))
            .collect();
        assert_eq!(marked, vec![format!("▶ {}", EXAMPLE_PROMPTS[1].title)]);
    }
}
