//! Main module for the Agentbot CLI application.
//!
//! This module provides the main function and auxiliary functionalities for
//! the CLI application. It handles command parsing, configuration loading, and
//! initialization, as well as invoking the appropriate functionalities based on
//! the provided command-line arguments.
//!
//! # Examples
//!
//! Chatting with the backend agent:
//!
//! ```sh
//! cargo run -- chat
//! agentbot chat --web-search
//! ```
//!
//! Ingesting a document and probing retrieval:
//!
//! ```sh
//! agentbot ingest notes.txt
//! agentbot query "what did the notes say about Rust?"
//! ```
//!
//! Initializing the application's configuration:
//!
//! ```sh
//! agentbot init
//! ```

use agentbot::commands::{Cli, Commands};
use agentbot::config::{self, AgentBotConfig};
use agentbot::embeddings::SentenceEmbedder;
use agentbot::relay::{BackendClient, ChatSession, interactive_mode};
use agentbot::vector_store::{DocumentStore, PineconeClient};
use agentbot::{config_dir, server};

use clap::Parser;
use once_cell::sync::OnceCell;
use std::{env, error::Error, fs, path::PathBuf};
use tracing::{debug, info};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

/// Main asynchronous function of the Agentbot CLI application.
///
/// Parses command-line arguments, loads configuration, and executes the
/// appropriate command.
///
/// # Errors
///
/// Returns an error if there is an issue loading the configuration, parsing the
/// command-line arguments, or executing the specified command.
async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // `init` must work before a configuration exists.
    if let Commands::Init = cli.command {
        debug!("Initializing configuration");
        return init();
    }

    let config_path = match env::var("AGENTBOT_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => config_dir()?.join("config.yaml"),
    };

    debug!("Loading config from: {}", config_path.display());
    let bot_config = config::load_config(
        config_path
            .to_str()
            .ok_or("Config path is not valid UTF-8")?,
    )?;
    debug!("Config loaded: {:?}", bot_config);

    match cli.command {
        Commands::Chat { web_search } => {
            let client = BackendClient::new(&bot_config.backend_base_url);
            let mut session = ChatSession::new(web_search || bot_config.web_search_enabled);
            interactive_mode(&client, &mut session).await?;
        }
        Commands::Ingest { file } => {
            let text = fs::read_to_string(&file)?;
            let store = build_store(&bot_config)?;
            let chunk_count = store.add_document(&text).await?;
            println!(
                "Added {chunk_count} chunks to {}",
                bot_config.pinecone_index
            );
        }
        Commands::Query { text, top_k } => {
            let store = build_store(&bot_config)?;
            let mut retriever = store.retriever().await?;
            if let Some(k) = top_k {
                retriever = retriever.with_top_k(k);
            }
            let chunks = retriever.retrieve(&text).await?;
            for chunk in chunks {
                println!("[{:.3}] (offset {}) {}", chunk.score, chunk.start_index, chunk.text);
            }
        }
        Commands::Serve => {
            server::start_server(&bot_config).await?;
        }
        Commands::Init => unreachable!("handled before config loading"),
    }

    Ok(())
}

/// Build the document store: embedding model plus Pinecone client.
fn build_store(bot_config: &AgentBotConfig) -> Result<DocumentStore, Box<dyn Error>> {
    let embedder = SentenceEmbedder::load()?;
    let client = PineconeClient::new(bot_config)?;
    Ok(DocumentStore::new(client, Box::new(embedder)).with_top_k(bot_config.top_k))
}

/// Initializes the application's configuration.
///
/// Creates the configuration directory and writes a starter `config.yaml` in
/// YAML format for the user to fill in.
///
/// # Errors
///
/// Returns an error if there is an issue creating the directory or file, or
/// serializing the configuration to YAML.
fn init() -> Result<(), Box<dyn Error>> {
    let config_dir = config_dir()?;
    info!("Creating config directory: {}", config_dir.display());
    fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.yaml");
    info!("Creating config file: {}", config_path.display());
    let bot_config = AgentBotConfig {
        pinecone_api_key: "CHANGEME".to_string(),
        pinecone_index: "agentbot-index".to_string(),
        pinecone_api_base: "https://api.pinecone.io".to_string(),
        backend_base_url: "http://localhost:8000".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 8000,
        top_k: 4,
        web_search_enabled: false,
    };
    let config_yaml = serde_yaml::to_string(&bot_config)?;
    fs::write(config_path, config_yaml)?;

    Ok(())
}
