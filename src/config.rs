//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `AgentBotConfig` struct, which holds the configuration parameters,
//! and a `load_config` function to load the configuration from a file.
//!
//! A missing or malformed configuration is a startup-time failure: every command
//! except `init` refuses to run without a valid file. The Pinecone API key may
//! also be supplied through the `PINECONE_API_KEY` environment variable, which
//! takes precedence over the file.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use agentbot::config::{AgentBotConfig, load_config};
//!
//! let config: AgentBotConfig = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{env, error::Error, fs};

use tracing::*;

/// Represents the application's configuration.
///
/// This struct holds the configuration parameters needed to run the application:
/// Pinecone credentials and index name, the backend agent's base URL, and the
/// bind address for the health-endpoint server. It can be constructed by loading
/// a YAML configuration file using the `load_config` function.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct AgentBotConfig {
    /// The Pinecone API key used to authenticate control- and data-plane requests.
    #[serde(default)]
    pub pinecone_api_key: String,

    /// The name of the Pinecone index used for document storage and retrieval.
    pub pinecone_index: String,

    /// Base URL of the Pinecone control plane.
    #[serde(default = "default_pinecone_api_base")]
    pub pinecone_api_base: String,

    /// Base URL of the backend agent the chat relay forwards prompts to.
    pub backend_base_url: String,

    /// Host for the health-endpoint server.
    #[serde(default = "default_server_host")]
    pub server_host: String,

    /// Port for the health-endpoint server.
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Default number of chunks returned by the retriever.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Whether the backend agent should be asked to use web search.
    #[serde(default)]
    pub web_search_enabled: bool,
}

fn default_pinecone_api_base() -> String {
    "https://api.pinecone.io".to_string()
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_top_k() -> usize {
    4
}

/// Loads the application's configuration from a YAML file.
///
/// This function reads the file at the given path, parses it as YAML, and
/// constructs an `AgentBotConfig` struct from it. If `PINECONE_API_KEY` is set
/// in the environment it overrides the file's `pinecone_api_key` value. The
/// key must be non-empty after both sources are considered.
///
/// # Parameters
///
/// - `file`: The path to the YAML configuration file.
///
/// # Returns
///
/// - `Ok(AgentBotConfig)`: The loaded configuration.
/// - `Err(Box<dyn Error>)`: An error occurred while reading the file, parsing
///   the YAML, or no API key was provided.
///
/// # Examples
///
/// ```no_run
/// use agentbot::config::load_config;
///
/// match load_config("/path/to/config.yaml") {
///     Ok(config) => println!("{:?}", config),
///     Err(err) => eprintln!("Error loading config: {}", err),
/// }
/// ```
pub fn load_config(file: &str) -> Result<AgentBotConfig, Box<dyn Error>> {
    debug!("Loading config from: {:?}", file);
    let content = fs::read_to_string(file)?;
    let mut config: AgentBotConfig = serde_yaml::from_str(&content)?;

    if let Ok(key) = env::var("PINECONE_API_KEY") {
        config.pinecone_api_key = key;
    }

    if config.pinecone_api_key.is_empty() {
        return Err("pinecone_api_key is not set (config file or PINECONE_API_KEY)".into());
    }

    Ok(config)
}
