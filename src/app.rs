//! Full-screen chat loop

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};

use crate::config::Config;
use crate::controller::ChatController;
use crate::ui::conversation::{ConversationAction, ConversationManager};

type ChatTerminal = Terminal<CrosstermBackend<Stdout>>;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn setup_terminal() -> Result<ChatTerminal> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e).context("Failed to enter alternate screen");
    }
    Terminal::new(CrosstermBackend::new(stdout))
        .inspect_err(|_| {
            let _ = disable_raw_mode();
        })
        .context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut ChatTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the interactive chat until the user quits
pub async fn run(controller: ChatController, config: &Config) -> Result<()> {
    let mut manager = ConversationManager::new(controller, &config.ui);
    let mut terminal = setup_terminal()?;
    info!(model = ?manager.controller().model(), "Chat UI started");

    let result = event_loop(&mut terminal, &mut manager);

    manager.shutdown();
    if let Err(e) = restore_terminal(&mut terminal) {
        warn!(error = %e, "Failed to restore terminal");
    }
    info!("Chat UI stopped");
    result
}

fn event_loop(terminal: &mut ChatTerminal, manager: &mut ConversationManager) -> Result<()> {
    loop {
        manager.process_stream_updates();
        terminal.draw(|f| {
            let area = f.size();
            manager.render(area, f.buffer_mut());
        })?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if manager.handle_key(key) == ConversationAction::Exit {
                    return Ok(());
                }
            }
        }
        manager.on_tick();
    }
}
