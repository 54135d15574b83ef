use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Write as _;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use agent_core::agent::build_service;
use agent_core::client::{new_session_id, AgentClient};
use agent_core::config::{AgentConfig, MemoryBackend};
use agent_core::gateway::{GatewayClient, ToolGateway};
use agent_core::memory::{LongTermMemory, SqliteEventStore};
use agent_core::observability::{setup_logging, MetricsCollector};
use agent_core::server::{self, AppState};
use agent_core::InvocationRequest;

#[derive(Parser)]
#[command(name = "agentcore", version, about = "Memory-backed agent server and client")]
struct Cli {
    /// Path to the TOML configuration file (defaults to $AGENT_CONFIG)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP agent server
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Interactive chat against a running server
    Chat {
        #[arg(long, default_value = "http://localhost:8080")]
        url: String,
        /// Reuse a session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
    },
    /// Send a single prompt and print the reply
    Invoke {
        #[arg(long, default_value = "http://localhost:8080")]
        url: String,
        #[arg(long)]
        session: Option<String>,
        prompt: String,
    },
    /// Inspect or seed durable memory (sqlite backend)
    Memory {
        #[command(subcommand)]
        command: MemoryCommand,
    },
    /// Talk to the tool gateway directly
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },
}

#[derive(Subcommand)]
enum MemoryCommand {
    /// Dump durable memories for every configured strategy
    Read {
        #[arg(long)]
        session: Option<String>,
        #[arg(long, default_value = "*")]
        query: String,
    },
    /// Store a memory in a namespace
    Add {
        #[arg(long)]
        namespace: String,
        text: String,
    },
}

#[derive(Subcommand)]
enum ToolsCommand {
    List,
    Call {
        name: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AgentConfig::load(cli.config.as_deref()).context("loading configuration")?;
    setup_logging(&config.logging);

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let metrics = MetricsCollector::new()?;
            let service = build_service(&config, metrics).await?;
            let state = AppState {
                service: Arc::new(service),
            };
            let app = server::router(state, Duration::from_secs(config.server.request_timeout_secs));
            server::serve(app, config.server.bind).await?;
        }
        Command::Chat { url, session } => {
            let client = AgentClient::new(url, Duration::from_secs(config.server.request_timeout_secs))?;
            chat_loop(&client, session.unwrap_or_else(new_session_id)).await?;
        }
        Command::Invoke { url, session, prompt } => {
            let client = AgentClient::new(url, Duration::from_secs(config.server.request_timeout_secs))?;
            let mut request = InvocationRequest::new(prompt);
            request.session_id = session;
            let response = client.invoke(&request).await?;
            println!("{}", response.message);
        }
        Command::Memory { command } => {
            if config.memory.backend != MemoryBackend::Sqlite {
                bail!("durable memory can only be inspected with the sqlite backend");
            }
            let store = SqliteEventStore::new(&config.memory.db_path).await?;
            match command {
                MemoryCommand::Read { session, query } => {
                    let session = session.unwrap_or_else(|| config.agent.default_session.clone());
                    read_memories(&store, &config, &session, &query).await?;
                }
                MemoryCommand::Add { namespace, text } => {
                    let record = store.store_memory(&namespace, &text).await?;
                    println!("stored {} in {}", record.record_id, record.namespace);
                }
            }
        }
        Command::Tools { command } => {
            let gateway = GatewayClient::from_config(&config.gateway)?;
            match command {
                ToolsCommand::List => {
                    for tool in gateway.list_tools().await? {
                        println!("{}\t{}", tool.name, tool.description.unwrap_or_default());
                    }
                }
                ToolsCommand::Call { name, args } => {
                    let arguments: Value =
                        serde_json::from_str(&args).context("--args must be valid JSON")?;
                    let result = gateway.call_tool(&name, &arguments).await?;
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
            }
        }
    }

    Ok(())
}

async fn chat_loop(client: &AgentClient, session_id: String) -> anyhow::Result<()> {
    println!("Starting chat session: {}", session_id);
    println!("Type 'exit' to end the chat.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("Ending session.");
            break;
        }

        let request = InvocationRequest::new(input).with_session(session_id.clone());
        match client.invoke(&request).await {
            Ok(response) => println!("Agent: {}", response.message),
            Err(err) => println!("Error: {}", err),
        }
    }

    Ok(())
}

async fn read_memories(
    store: &SqliteEventStore,
    config: &AgentConfig,
    session: &str,
    query: &str,
) -> anyhow::Result<()> {
    if config.memory.strategies.is_empty() {
        println!("No memory strategies configured.");
        return Ok(());
    }

    for strategy in &config.memory.strategies {
        for namespace in strategy.namespaces(&config.memory.actor_id, session) {
            println!("\nStrategy: {:?} | Namespace: {}", strategy.kind, namespace);
            let memories = store.retrieve_memories(&namespace, query).await?;
            if memories.is_empty() {
                println!("   No memories found.");
            }
            for memory in memories {
                println!("   [{}] {}", memory.created_at.to_rfc3339(), memory.text);
            }
        }
    }

    Ok(())
}
