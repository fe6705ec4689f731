use anyhow::{anyhow, bail, Result};
use crate::controller::{trailing_ai_message, ChatController, Phase};
use crate::events::StreamUpdateKind;
use crate::streaming;
use std::io::Write;
use tracing::info;

/// Send one prompt and write the reply to `out` as it streams in
pub async fn ask<W: Write>(controller: &mut ChatController, prompt: &str, out: &mut W) -> Result<()> {
    let ticket = match controller.submit(prompt) {
        Ok(Some(ticket)) => ticket,
        Ok(None) => bail!("Usage: gemchat ask <prompt>"),
        Err(e) => {
            let message = controller
                .state()
                .error
                .clone()
                .unwrap_or_else(|| e.user_message().to_string());
            return Err(anyhow!(message));
        }
    };

    info!(chars = prompt.chars().count(), "Asking one-shot prompt");
    let (tx, mut rx) = streaming::update_channel();
    streaming::spawn_stream(ticket, tx);

    let mut printed = 0;
    while let Some(update) = rx.recv().await {
        let is_terminal = update.kind.is_terminal();
        let failed = matches!(update.kind, StreamUpdateKind::Failed { .. });
        controller.apply(update);
        if failed {
            break;
        }

        if let Some(message) = trailing_ai_message(controller.state()) {
            if let Some(delta) = message.text.get(printed..).filter(|d| !d.is_empty()) {
                write!(out, "{delta}")?;
                out.flush()?;
                printed = message.text.len();
            }
        }

        if is_terminal {
            break;
        }
    }

    if controller.phase() == Phase::Errored {
        let message = controller.state().error.clone().unwrap_or_default();
        if printed > 0 {
            writeln!(out)?;
        }
        return Err(anyhow!(message));
    }

    writeln!(out)?;
    Ok(())
}
