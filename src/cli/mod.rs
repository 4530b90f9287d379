//! CLI module for Palaver.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Palaver - a tool-using chat agent
///
/// Serves a single chat endpoint backed by a language model that can search
/// the web, look up the weather, fetch video transcripts, send email and
/// generate websites.
#[derive(Parser, Debug)]
#[command(name = "palaver")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP chat server
    Serve {
        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory with the UI bundle served at /
        #[arg(long)]
        static_dir: Option<String>,
    },

    /// Start an interactive chat session in the terminal
    Chat,

    /// Check credentials and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
