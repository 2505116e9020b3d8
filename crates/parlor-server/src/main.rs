//! Parlor server binary
//!
//! Loads the relay configuration, resolves the model credential, wires the
//! Gemini chat and summary clients into a conversation service and serves the
//! chat API until interrupted. A missing credential or unreadable prompt file
//! stops startup with a non-zero exit.
//!
//! A `.env` file in the working directory is loaded before the command line is
//! parsed, so `PORT` and the model credential may come from there.

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use parlor_core::config::ConfigLoader;
use parlor_core::llm::providers::{create_chat_model, create_summary_generator};
use parlor_core::ConversationService;
use parlor_server::{shutdown_signal, ParlorServer, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Parlor Server - Chat relay with conversation memory")]
struct Cli {
    #[clap(long, short, help = "Path to a YAML configuration file (built-in defaults when omitted)")]
    config: Option<PathBuf>,

    #[clap(long, env = "PORT", default_value_t = 3000, help = "Port to listen on")]
    port: u16,

    #[clap(long, help = "Full bind address; overrides --port when given")]
    bind_addr: Option<String>,

    #[clap(long = "cors-origin", help = "Allowed CORS origin (repeatable; any origin when omitted)")]
    cors_origins: Vec<String>,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize logger
    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    match dotenv {
        Ok(path) => log::info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
    }

    run_server(cli).await
}

fn server_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = match &cli.bind_addr {
        Some(addr) => ServerConfig::default().with_bind_addr_str(addr)?,
        None => ServerConfig::default().with_port(cli.port),
    };
    if !cli.cors_origins.is_empty() {
        config = config.with_cors_origins(cli.cors_origins.clone());
    }
    Ok(config.with_logging(true))
}

async fn run_server(cli: Cli) -> Result<()> {
    if let Some(path) = &cli.config {
        log::info!("Loading configuration from file: {}", path.display());
    }
    let config = ConfigLoader::load(cli.config.as_deref()).await?;
    log::info!(
        "Configuration loaded: chat model {}, summary model {}, summary threshold {}",
        config.llm.model,
        config.llm.summary_model,
        config.memory.summary_threshold
    );

    let chat_model = create_chat_model(&config.llm)?;
    let summary_generator = create_summary_generator(&config.llm)?;
    let service = Arc::new(ConversationService::from_config(
        &config,
        chat_model,
        summary_generator,
    )?);

    let server_config = server_config(&cli)?;

    log::info!("Starting Parlor server on {}...", server_config.bind_addr);

    let server = ParlorServer::with_config(service, server_config);

    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
