mod app;
mod commands;
mod config;
mod controller;
mod error;
mod events;
mod llm;
mod prompts;
mod scroll;
mod store;
mod streaming;
mod ui;

#[cfg(test)]
mod test_utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::controller::ChatController;
use crate::llm::{initialize_chat, ChatSession};

#[derive(Parser)]
#[command(name = "gemchat")]
#[command(version = "0.1.0")]
#[command(about = "Chat with Gemini from the terminal", long_about = None)]
struct Cli {
    /// Model to use instead of the configured one
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Path to an alternate config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single prompt and print the streamed reply
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
}

/// Send logs to ~/.gemchat/gemchat.log; stdout belongs to the UI
fn init_logging() {
    let Ok(dir) = Config::home_dir() else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("gemchat.log"))
    else {
        return;
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemchat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = Config::load(cli.config.as_deref())?.with_model_override(cli.model);
    let session = initialize_chat(&config).map(|session| Arc::new(session) as Arc<dyn ChatSession>);
    let mut controller = ChatController::new(session);

    match cli.command {
        None => app::run(controller, &config).await,
        Some(Commands::Ask { prompt }) => {
            let prompt = prompt.join(" ");
            let mut stdout = std::io::stdout();
            if let Err(e) = commands::ask(&mut controller, &prompt, &mut stdout).await {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
