//! Palaver - a tool-augmented conversational agent backend
//!
//! A single chat endpoint routes each message through a language model that
//! may call tools (web search, weather, video transcripts, email, website
//! generation) before answering. Conversations are kept in memory and keyed
//! by thread id.
//!
//! # Architecture
//!
//! - `config` - Settings, credentials and prompt templates
//! - `conversation` - Messages, the conversation store and per-thread locks
//! - `tools` - The `Tool` trait, the registry and the built-in tools
//! - `model` - The language model adapter
//! - `agent` - The orchestration loop for one turn
//! - `session` - Thread resolution and persistence around a turn
//! - `server` - The HTTP surface
//!
//! # Example
//!
//! ```rust,no_run
//! use palaver::config::{Credentials, Settings};
//! use palaver::session::ChatService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let credentials = Credentials::from_env();
//!     let prompts = settings.load_prompts()?;
//!     let service = ChatService::from_settings(&settings, &credentials, &prompts)?;
//!
//!     let reply = service.handle("What's the weather in London?", None).await?;
//!     println!("[{}] {}", reply.thread_id, reply.response);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod model;
pub mod server;
pub mod session;
pub mod tools;

pub use error::{PalaverError, Result};
