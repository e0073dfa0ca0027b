//! # Agentbot (library root)
//!
//! This crate provides the core plumbing for the **Agentbot** RAG demo:
//! - Document ingestion and retrieval over a hosted Pinecone index (`vector_store`).
//! - Sentence embeddings via Candle, pure Rust ML (`embeddings`).
//! - Fixed-window text splitting with start offsets (`splitter`).
//! - A chat relay that forwards prompts to a remote backend agent (`relay`).
//! - A tiny health-endpoint HTTP server (`server`).
//! - CLI parsing & configuration (`commands`, `config`).
//!
//! The backend agent's reasoning lives in a separate service; this crate only
//! speaks to it over HTTP. The Pinecone index is the single shared mutable
//! resource and its own consistency model governs concurrent writers.
//!
//! ## Modules
//! - [`commands`], [`config`], [`embeddings`], [`relay`], [`server`],
//!   [`splitter`], [`vector_store`]

use directories::ProjectDirs;
use std::error::Error;

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod relay;
pub mod server;
pub mod splitter;
pub mod vector_store;

/// Return the per-platform configuration directory used by Agentbot.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "awful-sec", "agentbot")`, so you get the right place on each OS
/// (e.g., `~/.config/agentbot` on Linux via XDG).
///
/// The directory is **not** created by this function; callers that need it should
/// create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined
/// (which is rare but possible in heavily sandboxed environments).
///
/// # Examples
/// ```rust
/// let cfg = agentbot::config_dir().expect("has a config dir");
/// println!("config at {}", cfg.display());
/// ```
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "awful-sec", "agentbot")
        .ok_or("Unable to determine config directory")?;
    let config_dir = proj_dirs.config_dir().to_path_buf();

    Ok(config_dir)
}
