use crate::config::UiConfig;
use crate::controller::ChatController;
use crate::error::ChatError;
use crate::prompts::{example_prompt, EXAMPLE_PROMPTS};
use crate::streaming::{self, UpdateReceiver, UpdateSender};
use crate::ui::conversation::commands::{get_help_text, ParsedCommand, SlashCommand};
use crate::ui::conversation::composer::{ComposerResult, ConversationComposer};
use crate::ui::conversation::history::{transcript_lines, ConversationHistory};
use crate::ui::conversation::prompt_picker::PromptPicker;
use crate::ui::conversation::streaming::StreamingIndicator;
use crate::ui::conversation::view::{present, ConversationBody};
use crate::scroll::ScrollController;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Wires the controller to the widgets, the keyboard and the consumer tasks
pub struct ConversationManager {
    controller: ChatController,
    composer: ConversationComposer,
    scroll: ScrollController,
    selected_prompt: usize,
    notice: Option<String>,
    show_timestamps: bool,
    tick: u64,
    update_tx: UpdateSender,
    update_rx: UpdateReceiver,
}

const PAGE_LINES: usize = 10;

impl ConversationManager {
    pub fn new(controller: ChatController, ui: &UiConfig) -> Self {
        let (update_tx, update_rx) = streaming::update_channel();
        Self {
            controller,
            composer: ConversationComposer::new("Type a message, or / for commands..."),
            scroll: ScrollController::new(),
            selected_prompt: 0,
            notice: None,
            show_timestamps: ui.show_timestamps,
            tick: 0,
            update_tx,
            update_rx,
        }
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    /// Hand text to the controller and start a consumer task for it.
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, text: &str) {
        self.notice = None;
        match self.controller.submit(text) {
            Ok(Some(ticket)) => {
                streaming::spawn_stream(ticket, self.update_tx.clone());
            }
            Ok(None) => {}
            Err(e @ (ChatError::Busy | ChatError::NoSession)) => {
                self.notice = Some(e.user_message().to_string());
            }
            Err(e) => {
                debug!(error = %e, "Submit refused");
            }
        }
        self.composer.set_enabled(!self.controller.is_busy());
    }

    /// Apply every update that has arrived since the last call, in order
    pub fn process_stream_updates(&mut self) {
        loop {
            match self.update_rx.try_recv() {
                Ok(update) => {
                    self.controller.apply(update);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.composer.set_enabled(!self.controller.is_busy());
    }

    /// Advance the loading animation
    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return ConversationAction::Exit;
        }

        match key.code {
            KeyCode::PageUp => {
                self.scroll.scroll_up(PAGE_LINES);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll.scroll_down(PAGE_LINES);
                return ConversationAction::None;
            }
            _ => {}
        }

        if self.prompts_visible() && self.composer.is_empty() {
            match key.code {
                KeyCode::Up => {
                    self.selected_prompt =
                        (self.selected_prompt + EXAMPLE_PROMPTS.len() - 1) % EXAMPLE_PROMPTS.len();
                    return ConversationAction::None;
                }
                KeyCode::Down => {
                    self.selected_prompt = (self.selected_prompt + 1) % EXAMPLE_PROMPTS.len();
                    return ConversationAction::None;
                }
                KeyCode::Enter if key.modifiers.is_empty() => {
                    let prompt = example_prompt(self.selected_prompt).prompt;
                    self.submit(prompt);
                    return ConversationAction::None;
                }
                _ => {}
            }
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => {
                self.submit(&text);
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
                ConversationAction::None
            }
            SlashCommand::Quit => ConversationAction::Exit,
        }
    }

    fn prompts_visible(&self) -> bool {
        let state = self.controller.state();
        state.messages.is_empty() && !state.is_loading
    }

    /// Cancel in-flight streams before the UI goes away
    pub fn shutdown(&mut self) {
        self.controller.shutdown();
    }

    /// Render the whole screen. Takes `&mut self` because the scroll
    /// controller reconciles against the laid-out transcript.
    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let view = present(self.controller.state(), self.selected_prompt);
        let model = self.controller.model().unwrap_or("not connected").to_string();

        let banner_height = if view.banner.is_some() { 3 } else { 0 };
        let notice_height = if self.notice.is_some() { 3 } else { 0 };
        let indicator_height = if view.is_loading { 1 } else { 0 };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(banner_height),
                Constraint::Length(notice_height),
                Constraint::Length(indicator_height),
                Constraint::Length(3),
            ])
            .split(area);

        render_header(&model, chunks[0], buf);

        match &view.body {
            ConversationBody::ExamplePrompts { selected } => {
                PromptPicker::new(*selected).render(chunks[1], buf);
            }
            ConversationBody::Transcript(messages) => {
                let inner = ConversationHistory::block().inner(chunks[1]);
                let lines = transcript_lines(messages, inner.width, self.show_timestamps);
                let offset = self
                    .scroll
                    .observe(view.revision, lines.len(), inner.height as usize);
                ConversationHistory::new(&lines, offset).render(chunks[1], buf);
            }
        }

        if let Some(banner) = &view.banner {
            render_message_box(banner, "⚠️  Error", Color::Red, chunks[2], buf);
        }

        if let Some(notice) = &self.notice {
            render_message_box(notice, "ℹ️  Info", Color::Cyan, chunks[3], buf);
        }

        if view.is_loading {
            StreamingIndicator::new(&model, self.tick / 4).render(chunks[4], buf);
        }

        (&self.composer).render(chunks[5], buf);
    }
}

fn render_header(model: &str, area: Rect, buf: &mut Buffer) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let header = Line::from(vec![
        Span::styled(
            " ✨ gemchat ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("· {model}"), Style::default().fg(Color::DarkGray)),
    ]);
    buf.set_line(area.x, area.y, &header, area.width);
}

fn render_message_box(text: &str, title: &str, color: Color, area: Rect, buf: &mut Buffer) {
    Paragraph::new(text.to_string())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .border_style(Style::default().fg(color)),
        )
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{INIT_FAILURE_MESSAGE, NO_SESSION_MESSAGE};
    use crate::events::Sender;
    use crate::test_utils::ScriptedSession;
    use std::sync::Arc;
    use std::time::Duration;

    fn manager_with(session: ScriptedSession) -> ConversationManager {
        ConversationManager::new(
            ChatController::new(Ok(Arc::new(session))),
            &UiConfig::default(),
        )
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn screen(manager: &mut ConversationManager) -> Buffer {
        let area = Rect::new(0, 0, 60, 24);
        let mut buf = Buffer::empty(area);
        manager.render(area, &mut buf);
        buf
    }

    fn screen_text(buf: &Buffer) -> String {
        let area = buf.area;
        let mut text = String::new();
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                text.push_str(buf.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    async fn settle(manager: &mut ConversationManager) {
        for _ in 0..100 {
            manager.process_stream_updates();
            if !manager.controller().is_busy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stream did not finish");
    }

    #[tokio::test]
    async fn enter_on_empty_transcript_sends_selected_example() {
        let session = Arc::new(ScriptedSession::with_chunks(&["Sure"]));
        let mut manager = ConversationManager::new(
            ChatController::new(Ok(session.clone())),
            &UiConfig::default(),
        );

        manager.handle_key(press(KeyCode::Down));
        manager.handle_key(press(KeyCode::Enter));
        settle(&mut manager).await;

        assert_eq!(session.sent_messages(), vec![EXAMPLE_PROMPTS[1].prompt.to_string()]);
        let messages = manager.controller().state().messages.as_slice();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, "Sure");
    }

    #[tokio::test]
    async fn typed_message_streams_and_renders() {
        let mut manager = manager_with(ScriptedSession::with_chunks(&["Hi", " there", "!"]));
        for c in "Hello".chars() {
            manager.handle_key(press(KeyCode::Char(c)));
        }
        manager.handle_key(press(KeyCode::Enter));
        assert!(manager.controller().state().is_loading);
        settle(&mut manager).await;

        let state = manager.controller().state();
        assert_eq!(state.messages.as_slice()[0].sender, Sender::User);
        assert_eq!(state.messages.as_slice()[1].text, "Hi there!");

        let text = screen_text(&screen(&mut manager));
        assert!(text.contains("Hello"));
        assert!(text.contains("Hi there!"));
        assert!(!text.contains("Try an example"));
    }

    #[test]
    fn init_failure_shows_banner_and_prompts() {
        let mut manager = ConversationManager::new(
            ChatController::new(Err(ChatError::Initialization("no key".into()))),
            &UiConfig::default(),
        );
        let text = screen_text(&screen(&mut manager));
        assert!(text.contains(INIT_FAILURE_MESSAGE));
        assert!(text.contains("Try an example"));
        assert!(text.contains("not connected"));
    }

    #[test]
    fn submit_without_session_adds_nothing() {
        let mut manager = ConversationManager::new(
            ChatController::new(Err(ChatError::Initialization("no key".into()))),
            &UiConfig::default(),
        );
        manager.submit("Hello");

        let state = manager.controller().state();
        assert!(state.messages.is_empty());
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some(INIT_FAILURE_MESSAGE));
        assert_eq!(manager.notice.as_deref(), Some(NO_SESSION_MESSAGE));
    }

    #[test]
    fn rendering_identical_state_is_identical() {
        let mut manager = manager_with(ScriptedSession::with_chunks(&[]));
        assert_eq!(screen(&mut manager), screen(&mut manager));
    }

    #[test]
    fn quit_command_and_ctrl_c_exit() {
        let mut manager = manager_with(ScriptedSession::with_chunks(&[]));
        for c in "/quit".chars() {
            manager.handle_key(press(KeyCode::Char(c)));
        }
        // first Enter accepts the palette entry, second runs it
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::None);
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::Exit);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(manager.handle_key(ctrl_c), ConversationAction::Exit);
    }

    #[test]
    fn help_command_sets_notice() {
        let mut manager = manager_with(ScriptedSession::with_chunks(&[]));
        for c in "/help ".chars() {
            manager.handle_key(press(KeyCode::Char(c)));
        }
        manager.handle_key(press(KeyCode::Enter));
        assert_eq!(manager.notice.as_deref(), Some(get_help_text().as_str()));
        assert!(manager.controller().state().messages.is_empty());
    }

    #[tokio::test]
    async fn long_transcript_is_pinned_to_bottom() {
        let reply: Vec<String> = (0..40).map(|i| format!("line{i}\n")).collect();
        let chunks: Vec<&str> = reply.iter().map(String::as_str).collect();
        let mut manager = manager_with(ScriptedSession::with_chunks(&chunks));
        manager.submit("Hello");
        settle(&mut manager).await;

        let text = screen_text(&screen(&mut manager));
        assert!(text.contains("line39"));
        assert!(!text.contains("line0 "));

        manager.handle_key(press(KeyCode::PageUp));
        manager.handle_key(press(KeyCode::PageUp));
        manager.handle_key(press(KeyCode::PageUp));
        let text = screen_text(&screen(&mut manager));
        assert!(!text.contains("line39"));
    }

    #[tokio::test]
    async fn wide_character_reply_is_fully_visible() {
        let reply: String = (0..60u32)
            .filter_map(|i| char::from_u32(0x4E00 + i))
            .collect();
        let mut manager = manager_with(ScriptedSession::with_chunks(&[reply.as_str()]));
        manager.submit("Hello");
        settle(&mut manager).await;

        let text = screen_text(&screen(&mut manager));
        let missing: Vec<char> = reply.chars().filter(|c| !text.contains(*c)).collect();
        assert!(missing.is_empty(), "missing {} of 60 chars", missing.len());
    }

    #[test]
    fn tiny_terminals_render_without_panicking() {
        let mut manager = manager_with(ScriptedSession::with_chunks(&[]));
        for c in "/".chars() {
            manager.handle_key(press(KeyCode::Char(c)));
        }
        for width in 1..12 {
            for height in 1..10 {
                let area = Rect::new(0, 0, width, height);
                let mut buf = Buffer::empty(area);
                manager.render(area, &mut buf);
            }
        }
    }
}
