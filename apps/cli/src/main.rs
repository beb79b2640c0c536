//! Trellis CLI - assistant console for the Trellis control plane.
//!
//! Provides a `trellis` command that mounts one assistant channel and
//! drives it from the terminal. The channel connects lazily: no network
//! activity happens until the first message is sent.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::chat::{self, ChatOptions};

/// Trellis assistant console.
///
/// Chat with the Trellis assistant over its realtime channel, falling back
/// to one-shot requests when the realtime connection is unavailable.
#[derive(Parser, Debug)]
#[command(
    name = "trellis",
    author,
    version,
    about = "Trellis - assistant console for the automation control plane"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat with the assistant (default)
    ///
    /// Opens an interactive console. Messages are streamed over the
    /// realtime channel when the assistant service is reachable; otherwise
    /// each message is answered through the one-shot endpoint.
    Chat(ChatOptions),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = args.log_level.parse::<Level>().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Some(Command::Chat(options)) => chat::execute(options).await,
        None => chat::execute(ChatOptions::default()).await,
    }
}
