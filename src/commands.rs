//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.
//!
//! # Examples
//!
//! Parsing command-line arguments:
//!
//! ```no_run
//! use clap::Parser;
//! use agentbot::commands::Cli;
//!
//! let cli = Cli::parse();
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Represents the parsed command-line arguments.
///
/// This struct is constructed by parsing the command-line arguments using `clap`.
/// It contains a `command` field that holds the parsed subcommand and its options.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
///
/// Each variant of this enum corresponds to a subcommand that the user can invoke
/// from the command line, along with any options specific to that subcommand.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// The 'chat' subcommand: interactive conversation relayed to the backend agent.
    ///
    /// This subcommand can be invoked with either 'c' or 'chat'.
    #[clap(name = "chat", alias = "c")]
    Chat {
        /// Ask the backend agent to use web search for this session.
        #[arg(name = "web-search", short = 'w', long = "web-search")]
        web_search: bool,
    },

    /// The 'ingest' subcommand: split, embed, and upsert a text file into the index.
    #[clap(name = "ingest")]
    Ingest {
        /// Path to the text file to ingest.
        file: PathBuf,
    },

    /// The 'query' subcommand: similarity-search the index directly.
    #[clap(name = "query", alias = "q")]
    Query {
        /// The query text.
        text: String,

        /// How many chunks to return.
        #[arg(name = "top-k", short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },

    /// The 'serve' subcommand: run the health-endpoint HTTP server.
    #[clap(name = "serve")]
    Serve,

    /// The 'init' subcommand, which takes no arguments and is used for initialization.
    ///
    /// When invoked, this subcommand writes a starter configuration file.
    Init,
}
