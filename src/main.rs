use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use whisperfunc::bridge::Bridge;
use whisperfunc::cli::{list_sessions, ChatCli};
use whisperfunc::config::AppConfig;
use whisperfunc::llm::openai::OpenAiClient;
use whisperfunc::orchestrator::Orchestrator;
use whisperfunc::server::{serve, AppState};
use whisperfunc::session::SessionStore;
use whisperfunc::tools::create_default_registry;

#[derive(Parser)]
#[command(name = "whisperfunc", version, about = "Function-calling chat assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP chat server (the default)
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Chat interactively in the terminal
    Chat {
        /// Resume an existing session by id
        #[arg(long)]
        session: Option<String>,
        /// List saved sessions and exit
        #[arg(long)]
        list: bool,
    },
    /// Serve the tool registry over stdio JSON-RPC
    Bridge,
    /// Write a default config file and exit
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Stderr only: the bridge subcommand owns stdout for protocol frames.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("whisperfunc=info,tower_http=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve { port: None });

    if let Command::InitConfig = command {
        let path = AppConfig::save_default()?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    let config = AppConfig::load()?;

    match command {
        Command::Serve { port } => {
            let addr: SocketAddr = format!(
                "{}:{}",
                config.server.bind,
                port.unwrap_or(config.server.port)
            )
            .parse()
            .context("invalid server bind address")?;
            let state = Arc::new(AppState {
                orchestrator: build_orchestrator(&config)?,
            });
            serve(state, addr).await
        }
        Command::Chat { session, list } => {
            let store = SessionStore::open_default()?;
            if list {
                return list_sessions(&store);
            }
            let orchestrator = Arc::new(build_orchestrator(&config)?);
            let mut chat = ChatCli::new(orchestrator, store, session.as_deref())?;
            chat.run().await
        }
        Command::Bridge => {
            let registry = Arc::new(create_default_registry(
                config.sandbox_root(),
                config.tools.product_search_base.clone(),
            ));
            Bridge::new(registry).run().await
        }
        Command::InitConfig => unreachable!(),
    }
}

fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    let api_key = config.api_key()?;
    let backend = OpenAiClient::new(
        api_key,
        config.llm.api_base.clone(),
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    )?
    .with_max_tokens(config.llm.max_tokens);
    let registry = create_default_registry(
        config.sandbox_root(),
        config.tools.product_search_base.clone(),
    );
    Ok(Orchestrator::new(Arc::new(backend), Arc::new(registry)))
}
