//! Interactive assistant console.
//!
//! REPL-style interface over one assistant channel: reads lines from
//! stdin, renders new turns as they land in the conversation log, and
//! exposes slash commands for mode switching and housekeeping.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use trellis_channel::{
    AssistantChannel, ChannelConfig, ChannelMode, Role, StaticCredentials, ToolStatus, Turn,
};

/// Options for the chat command.
#[derive(Debug, Default, clap::Args)]
pub struct ChatOptions {
    /// WebSocket endpoint of the assistant service
    #[arg(long)]
    pub channel_url: Option<String>,

    /// HTTP endpoint of the one-shot fallback
    #[arg(long)]
    pub assistant_url: Option<String>,

    /// Bearer token (defaults to $TRELLIS_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Initial operating mode (automation, agent, agent_flow, code)
    #[arg(long)]
    pub mode: Option<String>,

    /// Path to a channel config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Execute the chat command.
pub async fn execute(options: ChatOptions) -> Result<()> {
    let mut config = match &options.config {
        Some(path) => ChannelConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ChannelConfig::default(),
    };
    if let Some(url) = options.channel_url {
        config.channel_url = url;
    }
    if let Some(url) = options.assistant_url {
        config.assistant_url = url;
    }
    if let Some(mode) = options.mode.as_deref() {
        config.default_mode =
            mode.parse().map_err(|_| anyhow::anyhow!("Unknown mode '{mode}'"))?;
    }

    let token = options.token.or_else(|| std::env::var("TRELLIS_TOKEN").ok());
    let credentials = match token {
        Some(token) => StaticCredentials::bearer(token),
        None => StaticCredentials::anonymous(),
    };

    let channel = AssistantChannel::connect_lazy(config, Arc::new(credentials));
    let mut renderer = Renderer::new();
    let mut revisions = channel.revisions();

    print_banner(channel.mode());

    loop {
        print!("\n{} ", ">".green().bold());
        io::stdout().flush()?;

        let Some(line) = read_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" | "/q" => break,
            "/help" | "/h" => {
                print_help();
                continue;
            }
            "/clear" => {
                channel.clear();
                renderer.reset();
                println!("Conversation cleared.");
                continue;
            }
            _ if input == "/mode" || input.starts_with("/mode ") => {
                handle_mode_command(&channel, input);
                continue;
            }
            _ => {}
        }

        channel.send(input).await;
        renderer.render(&channel.turns());

        // Wait for the terminal frame or fallback response, rendering
        // turns and tool invocations as they arrive.
        while channel.is_loading() {
            if revisions.changed().await.is_err() {
                break;
            }
            renderer.render(&channel.turns());
        }
        renderer.render(&channel.turns());
    }

    channel.close().await;
    println!("\nGoodbye!");
    Ok(())
}

/// Read one line from stdin without blocking the runtime.
async fn read_line() -> Result<Option<String>> {
    let (read, line) = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let read = io::stdin().read_line(&mut line)?;
        Ok::<_, io::Error>((read, line))
    })
    .await??;
    Ok(if read == 0 { None } else { Some(line) })
}

fn handle_mode_command(channel: &AssistantChannel, input: &str) {
    match input.split_whitespace().nth(1) {
        Some(raw) => match raw.parse::<ChannelMode>() {
            Ok(mode) => {
                channel.set_mode(mode);
                println!("Mode set to {}.", mode.to_string().cyan().bold());
            }
            Err(_) => eprintln!(
                "{}: unknown mode '{raw}' (automation, agent, agent_flow, code)",
                "Error".red().bold()
            ),
        },
        None => println!("Current mode: {}", channel.mode().to_string().cyan().bold()),
    }
}

/// Incremental conversation renderer.
///
/// Tracks how much of the log has been printed so re-renders only emit new
/// turns and newly attached tool invocations.
struct Renderer {
    printed_turns: usize,
    printed_invocations: HashMap<String, usize>,
}

impl Renderer {
    fn new() -> Self {
        Self { printed_turns: 0, printed_invocations: HashMap::new() }
    }

    fn reset(&mut self) {
        self.printed_turns = 0;
        self.printed_invocations.clear();
    }

    fn render(&mut self, turns: &[Turn]) {
        for turn in &turns[self.printed_turns.min(turns.len())..] {
            self.print_turn(turn);
        }
        self.printed_turns = turns.len();

        // Invocations can attach to turns that were already printed.
        for turn in turns {
            let seen = self.printed_invocations.entry(turn.id.clone()).or_insert(0);
            for invocation in &turn.tool_invocations[(*seen).min(turn.tool_invocations.len())..] {
                let status = match invocation.status {
                    ToolStatus::Pending => "pending".yellow(),
                    ToolStatus::Running => "running".yellow(),
                    ToolStatus::Completed => "completed".green(),
                    ToolStatus::Failed => "failed".red(),
                };
                println!("  {} {} [{}]", "⚙".yellow(), invocation.name.bold(), status);
            }
            *seen = turn.tool_invocations.len();
        }
    }

    fn print_turn(&mut self, turn: &Turn) {
        match turn.role {
            // The user's line is already on screen.
            Role::User => {}
            Role::Assistant => {
                println!("\n{} {}", "Assistant:".cyan().bold(), turn.content);
            }
            Role::System => {
                println!("\n{} {}", "!".red().bold(), turn.content.red());
            }
        }
        // Attached invocations are printed by the invocation pass.
        self.printed_invocations.entry(turn.id.clone()).or_insert(0);
    }
}

/// Print welcome banner.
fn print_banner(mode: ChannelMode) {
    println!();
    println!("{}", "╔═══════════════════════════════════════════╗".cyan().bold());
    println!(
        "{}{}{}",
        "║  ".cyan().bold(),
        "Trellis Assistant".white().bold(),
        "                        ║".cyan().bold()
    );
    println!("{}", "╚═══════════════════════════════════════════╝".cyan().bold());
    println!();
    println!("{} {}", "Mode:    ".yellow().bold(), mode);
    println!("{} {}", "Commands:".green().bold(), "/help /mode /clear /quit");
}

/// Print help text.
fn print_help() {
    println!();
    let commands = vec![
        ("/help, /h", "Show this help message"),
        ("/mode", "Show the current operating mode"),
        ("/mode <name>", "Switch mode (automation, agent, agent_flow, code)"),
        ("/clear", "Clear the conversation"),
        ("/quit, /exit, /q", "Leave the console"),
    ];
    for (cmd, desc) in commands {
        println!("  {} - {}", cmd.green().bold(), desc);
    }
    println!();
    println!(
        "{} Messages stream over the realtime channel when available and fall back to one-shot requests otherwise.",
        "Tip:".yellow().bold()
    );
}
