use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{self, AsyncBufReadExt};
use tracing_subscriber::EnvFilter;

use engram::config::{Config, StorageConfig};
use engram::dispatch::{Dispatcher, ToolRequest, ToolResponse};
use engram::error::{EngramError, Result};
use engram::ingest;
use engram::system::MemorySystem;

#[derive(Parser, Debug)]
#[command(name = "engram")]
#[command(about = "Persistent memory daemon for AI assistants")]
struct Cli {
    #[arg(long, env = "ENGRAM_CONFIG", help = "Path to a JSON config file")]
    config: Option<String>,

    #[arg(long, env = "ENGRAM_DATA_DIR", help = "Directory holding the store databases")]
    data_dir: Option<String>,

    #[arg(long, default_value = "cli", help = "Client id recorded with telemetry")]
    client_id: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Answer JSON tool requests, one per stdin line
    Serve,
    /// Dispatch a single tool call and print the response envelope
    Call {
        #[arg(long)]
        tool: String,

        #[arg(long, default_value = "{}")]
        parameters: String,
    },
    /// Import a transcript file into the conversation store
    Import {
        path: PathBuf,

        #[arg(long, help = "Replay into an existing session instead of a fresh one")]
        session_id: Option<String>,
    },
    /// Print the system health summary
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut storage = match &cli.config {
        Some(path) => Config::from_file(path)?.storage,
        None => StorageConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        storage.data_dir = Some(dir.clone());
    }

    let system = Arc::new(MemorySystem::open(storage).await?);
    let dispatcher = Dispatcher::new(system.clone());

    match cli.command {
        Commands::Serve => serve(&dispatcher, &cli.client_id).await,
        Commands::Call { tool, parameters } => {
            let parameters = serde_json::from_str(&parameters)
                .map_err(|e| EngramError::Runtime(format!("Invalid parameters: {e}")))?;
            let request = ToolRequest {
                tool,
                parameters,
                client_id: Some(cli.client_id),
            };
            let response = dispatcher.dispatch(&request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Import { path, session_id } => {
            let stored = ingest::import_transcript(&system, &path, session_id.as_deref()).await?;
            println!("Imported {stored} messages from {}", path.display());
            Ok(())
        }
        Commands::Health => {
            let health = system.system_health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
            Ok(())
        }
    }
}

async fn serve(dispatcher: &Dispatcher, client_id: &str) -> Result<()> {
    let stdin = io::BufReader::new(io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| EngramError::Runtime(e.to_string()))?
    {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ToolRequest>(&line) {
            Ok(mut request) => {
                if request.client_id.is_none() {
                    request.client_id = Some(client_id.to_string());
                }
                dispatcher.dispatch(&request).await
            }
            Err(err) => ToolResponse::Error {
                error: format!("Invalid request: {err}"),
            },
        };
        println!("{}", serde_json::to_string(&response)?);
    }
    Ok(())
}
