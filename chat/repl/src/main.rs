//! Streamchat - Line-Oriented Chat Surface
//!
//! Reads one message per line from stdin, submits it to the chat service,
//! and prints the assistant's reply as it streams in.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (http://localhost:8000/api)
//! streamchat
//!
//! # Custom service address
//! streamchat --base-url https://chat.example.com/api
//!
//! # Request complete replies instead of streams
//! streamchat --no-stream
//!
//! # Verbose logging (written to stderr)
//! RUST_LOG=debug streamchat
//! ```
//!
//! Type `/quit` or send EOF to exit.

mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use streamchat_core::config::{self, ClientConfig, ConfigOverrides};
use streamchat_core::{ChatController, HttpChatService, SubmitOutcome, TurnError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use render::TranscriptPrinter;

/// Command that ends the session
const QUIT_COMMAND: &str = "/quit";

/// Streamchat - chat with a remote assistant from the terminal
#[derive(Parser, Debug)]
#[command(name = "streamchat")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Chat service base URL
    #[arg(short = 'u', long, value_name = "URL")]
    base_url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "STREAMCHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fetch complete replies instead of streaming them
    #[arg(long)]
    no_stream: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "STREAMCHAT_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so they never interleave with the transcript.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("streamchat={level},streamchat_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve configuration from file, environment, and CLI flags
fn load_configuration(args: &Args) -> Result<ClientConfig> {
    let mut config = match args.config {
        Some(ref path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            config::load_config_from_path(Some(path.clone()))
        }
        None => config::load_config(),
    }
    .context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(ref url) = args.base_url {
        overrides = overrides.with_base_url(url.clone());
    }
    if args.no_stream {
        overrides = overrides.with_streaming(false);
    }
    overrides.apply(&mut config);

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = load_configuration(&args)?;
    info!(
        base_url = %config.base_url,
        streaming = config.streaming,
        source = %config.source(),
        "Streamchat starting"
    );

    let error_message = config.error_message.clone();
    let service =
        HttpChatService::from_config(&config).context("Failed to create chat service client")?;
    let controller = ChatController::new(service, config);

    let mut updates = controller.subscribe();
    let render = tokio::spawn(async move {
        let mut printer = TranscriptPrinter::new();
        let mut stdout = tokio::io::stdout();
        while updates.changed().await.is_ok() {
            let text = printer.render(&updates.borrow_and_update());
            if !text.is_empty() {
                stdout.write_all(text.as_bytes()).await?;
                stdout.flush().await?;
            }
        }
        Ok::<(), std::io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        if line.trim() == QUIT_COMMAND {
            break;
        }

        match controller.submit(&line).await {
            SubmitOutcome::Failed(TurnError::SessionCreation) => {
                // Nothing reaches the log when no session exists
                stdout
                    .write_all(format!("{error_message}\n").as_bytes())
                    .await?;
                stdout.flush().await?;
            }
            SubmitOutcome::Failed(error) => warn!(error = %error, "Reply failed"),
            SubmitOutcome::RejectedBusy => warn!("Still waiting for the previous reply"),
            SubmitOutcome::Completed | SubmitOutcome::RejectedEmpty => {}
        }
    }

    drop(controller);
    render
        .await
        .context("Render task panicked")?
        .context("Failed to write transcript")?;

    info!("Streamchat stopped");
    Ok(())
}
