use crate::ui::conversation::commands::{
    command_entries, parse_slash_command, CommandEntry, ParsedCommand,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// Text input with a slash-command palette
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    content: String,
    /// Cursor position in characters
    cursor: usize,
    placeholder: String,
    enabled: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
            enabled: true,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                } else if self.show_command_palette {
                    self.apply_selected_command();
                } else if self.enabled && !self.content.trim().is_empty() {
                    let content = std::mem::take(&mut self.content);
                    self.cursor = 0;
                    self.close_command_palette();
                    return match parse_slash_command(&content) {
                        Some(command) => ComposerResult::Command(command),
                        None => ComposerResult::Submitted(content),
                    };
                }
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Esc if self.show_command_palette => self.close_command_palette(),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command();
            }
            KeyCode::Char(c) => {
                self.insert_char(c);
                if self.content.starts_with('/') && !self.content.contains(char::is_whitespace) {
                    if !self.show_command_palette {
                        self.open_command_palette();
                    } else {
                        self.refresh_command_palette();
                    }
                } else {
                    self.close_command_palette();
                }
            }
            KeyCode::Backspace => {
                if self.backspace() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Delete => {
                if self.delete() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_len());
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.char_len();
            }
            _ => {}
        }

        ComposerResult::None
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(index, _)| index)
            .unwrap_or(self.content.len())
    }

    /// Insert a character at the cursor position
    fn insert_char(&mut self, c: char) {
        let index = self.byte_index(self.cursor);
        self.content.insert(index, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let index = self.byte_index(self.cursor);
        self.content.remove(index);
        true
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let index = self.byte_index(self.cursor);
        self.content.remove(index);
        true
    }

    fn sync_command_palette(&mut self) {
        if self.show_command_palette {
            if self.content.starts_with('/') {
                self.refresh_command_palette();
            } else {
                self.close_command_palette();
            }
        }
    }

    fn open_command_palette(&mut self) {
        self.show_command_palette = true;
        self.selected_command = Some(0);
        self.refresh_command_palette();
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        self.selected_command = if self.filtered_commands.is_empty() {
            None
        } else {
            let index = self.selected_command.unwrap_or(0);
            Some(index.min(self.filtered_commands.len() - 1))
        };
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        self.selected_command = Some((current + delta).rem_euclid(len) as usize);
    }

    fn apply_selected_command(&mut self) {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index))
            .copied()
        else {
            self.close_command_palette();
            return;
        };

        self.content = format!("/{}", entry.keyword);
        self.cursor = self.char_len();
        self.close_command_palette();
    }

    /// Disable submission while a response is in flight
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    fn render_content(&self, inner_area: Rect, buf: &mut Buffer) {
        if inner_area.height == 0 || inner_area.width == 0 {
            return;
        }

        if self.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
            return;
        }

        let mut content = self.content.clone();
        content.insert(self.byte_index(self.cursor), '▌');

        // Scroll just far enough to keep the cursor's line in the box
        let cursor_line = self.content.chars().take(self.cursor).filter(|c| *c == '\n').count();
        let skip = (cursor_line + 1).saturating_sub(inner_area.height as usize);
        for (i, line_text) in content
            .split('\n')
            .skip(skip)
            .take(inner_area.height as usize)
            .enumerate()
        {
            let line = Line::from(vec![Span::raw(line_text)]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }

    fn title(&self) -> &'static str {
        if self.enabled {
            "✏️  Message (Enter to send)"
        } else {
            "⏳ Waiting for the reply..."
        }
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .style(if self.enabled {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);
        self.render_content(inner_area, buf);

        if self.show_command_palette && !self.filtered_commands.is_empty() {
            let palette_height = (self.filtered_commands.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: area.x,
                y: area.y.saturating_sub(palette_height),
                width: area.width,
                height: palette_height.min(area.y),
            };

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in self.filtered_commands.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if self.selected_command == Some(index) {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled(" - ", Style::default().fg(Color::DarkGray)),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
impl ConversationComposer {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::conversation::commands::SlashCommand;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_submits_and_clears() {
        let mut composer = ConversationComposer::new("Ask");
        type_text(&mut composer, "Hello");
        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Submitted("Hello".into())
        );
        assert!(composer.is_empty());
    }

    #[test]
    fn blank_input_does_not_submit() {
        let mut composer = ConversationComposer::new("Ask");
        type_text(&mut composer, "   ");
        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerResult::None);
        assert_eq!(composer.content(), "   ");
    }

    #[test]
    fn disabled_composer_keeps_text() {
        let mut composer = ConversationComposer::new("Ask");
        composer.set_enabled(false);
        type_text(&mut composer, "later");
        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerResult::None);
        assert_eq!(composer.content(), "later");

        composer.set_enabled(true);
        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Submitted("later".into())
        );
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut composer = ConversationComposer::new("Ask");
        type_text(&mut composer, "a");
        composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut composer, "b");
        assert_eq!(composer.content(), "a\nb");
    }

    #[test]
    fn editing_handles_multibyte_characters() {
        let mut composer = ConversationComposer::new("Ask");
        type_text(&mut composer, "héllo");
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "hllo");
        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Delete));
        assert_eq!(composer.content(), "llo");
    }

    #[test]
    fn slash_opens_palette_and_tab_completes() {
        let mut composer = ConversationComposer::new("Ask");
        type_text(&mut composer, "/q");
        assert!(composer.is_palette_open());
        composer.handle_key(press(KeyCode::Tab));
        assert!(!composer.is_palette_open());
        assert_eq!(composer.content(), "/quit");

        match composer.handle_key(press(KeyCode::Enter)) {
            ComposerResult::Command(parsed) => assert_eq!(parsed.command, SlashCommand::Quit),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn palette_selection_wraps() {
        let mut composer = ConversationComposer::new("Ask");
        type_text(&mut composer, "/");
        composer.handle_key(press(KeyCode::Up));
        composer.handle_key(press(KeyCode::Enter));
        assert_eq!(composer.content(), "/quit");
    }

    #[test]
    fn whitespace_closes_palette() {
        let mut composer = ConversationComposer::new("Ask");
        type_text(&mut composer, "/help ");
        assert!(!composer.is_palette_open());
    }

    #[test]
    fn render_shows_placeholder_when_empty() {
        let composer = ConversationComposer::new("Ask me");
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        (&composer).render(area, &mut buf);
        let row: String = (1..7).map(|x| buf.get(x, 1).symbol().to_string()).collect();
        assert_eq!(row, "Ask me");
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (buf.area.left()..buf.area.right())
            .map(|x| buf.get(x, y).symbol())
            .collect::<String>()
    }

    #[test]
    fn render_follows_cursor_in_tall_draft() {
        let mut composer = ConversationComposer::new("Ask");
        type_text(&mut composer, "l1");
        for line in ["l2", "l3"] {
            composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
            type_text(&mut composer, line);
        }

        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        (&composer).render(area, &mut buf);
        assert!(row_text(&buf, 1).contains("l3▌"));

        for _ in 0..8 {
            composer.handle_key(press(KeyCode::Left));
        }
        let mut buf = Buffer::empty(area);
        (&composer).render(area, &mut buf);
        assert!(row_text(&buf, 1).contains("▌l1"));
    }

    #[test]
    fn render_survives_tiny_areas() {
        let mut composer = ConversationComposer::new("Ask me anything");
        type_text(&mut composer, "/");
        for width in 1..8 {
            for height in 1..4 {
                let area = Rect::new(0, 0, width, height);
                let mut buf = Buffer::empty(area);
                (&composer).render(area, &mut buf);
            }
        }
    }
}
