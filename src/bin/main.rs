//! Vietnamese market agent CLI
//!
//! Commands:
//! - `chat`: Interactive conversation (default)
//! - `ask`: Answer one question and exit
//! - `tools`: List the registered tools

use clap::{Parser, Subcommand};
use std::error::Error;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use vn_market_agent::{agent::Orchestrator, config::AgentConfig};

#[derive(Parser)]
#[command(
    name = "vn-agent",
    about = "Vietnamese stock market Q&A agent",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent interactively
    Chat,

    /// Ask a single question
    Ask {
        /// The question, e.g. "Phân tích FPT"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// List available tools
    Tools,
}

const HELP: &str = "Commands:\n  /help   show this help\n  /clear  forget the conversation\n  /tools  list tools\n  /quit   exit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = AgentConfig::from_env()?;

    // Initialize tracing
    let filter = if cli.debug { "debug" } else { config.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut orchestrator = Orchestrator::bootstrap(&config)?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => interactive(&mut orchestrator).await?,
        Commands::Ask { query } => {
            let answer = orchestrator.chat(&query.join(" ")).await;
            println!("{}", answer);
        }
        Commands::Tools => print_tools(&orchestrator),
    }

    Ok(())
}

fn print_tools(orchestrator: &Orchestrator) {
    let registry = orchestrator.tools();
    for name in registry.names() {
        if let Some(tool) = registry.resolve(name) {
            println!("{:<22} {}", name, tool.description());
        }
    }
}

async fn interactive(orchestrator: &mut Orchestrator) -> Result<(), Box<dyn Error>> {
    println!("🇻🇳 Vietnamese market agent. Type /help for commands.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/clear" => {
                orchestrator.clear_memory();
                println!("Conversation cleared.");
            }
            "/tools" => print_tools(orchestrator),
            query => {
                let answer = orchestrator.chat(query).await;
                println!("\n{}\n", answer);
            }
        }
    }

    println!("Tạm biệt!");
    Ok(())
}
