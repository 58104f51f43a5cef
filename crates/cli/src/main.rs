mod config;
mod error;

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use host::{Catalog, HostService};
use runtime::{McpToolHost, OpenAiBackend, Session};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "vitals.toml";

#[derive(Parser)]
#[command(name = "vitals")]
#[command(about = "A system monitor with a natural-language interface", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// Run the tool host on stdio (spawned internally by chat)
    Serve,
    /// List the tool catalog
    Tools,
}

#[tokio::main]
async fn main() {
    // stdout is the serve transport, so diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(&cli.config).await,
        Some(Commands::Serve) => cmd_serve().await,
        Some(Commands::Tools) => cmd_tools(),
    }
}

async fn cmd_chat(config_path: &PathBuf) -> Result<()> {
    println!("vitals v{}", env!("CARGO_PKG_VERSION"));

    let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| Error::MissingApiKey)?;

    let config =
        Config::load_or_default(config_path).map_err(|e| Error::Config(e.to_string()))?;

    let mut builder = OpenAiBackend::builder(api_key, &config.backend.model)
        .base_url(&config.backend.base_url);
    if let Some(max_tokens) = config.backend.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }
    let backend = builder.build();

    // The tool host is this same binary in serve mode.
    let exe = std::env::current_exe()?;
    let host = McpToolHost::spawn(mcp::ServerConfig {
        name: "vitals-host".to_string(),
        command: exe.to_string_lossy().into_owned(),
        args: vec!["serve".to_string()],
        env: HashMap::new(),
    })
    .await?;

    println!("Model: {}", config.backend.model);
    println!("Connected to tool host ({} tools).", host.tool_count());
    println!("Type 'exit' to quit, 'reset' to clear the conversation.\n");

    let mut session = Session::new(backend, host);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }
        if input == "reset" {
            session.reset();
            println!("Conversation cleared.\n");
            continue;
        }

        match session.chat(input).await {
            Ok(exchange) => {
                if !exchange.tools_used.is_empty() {
                    println!("[tools: {}]", exchange.tools_used.join(", "));
                }
                println!("\n{}\n", exchange.reply);
            }
            Err(e) => {
                eprintln!("Error: {e}\n");
            }
        }
    }

    session.close().await;
    println!("\nGoodbye.");
    Ok(())
}

async fn cmd_serve() -> Result<()> {
    let service = HostService::new(Catalog::standard());
    mcp::server::serve_stdio(&service).await?;
    Ok(())
}

fn cmd_tools() -> Result<()> {
    let catalog = Catalog::standard();
    for tool in catalog.tools() {
        println!(
            "{:<28} {}",
            tool.name,
            tool.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
