//! # Command layer
//!
//! Everything between a transport and the campaign store:
//!
//! - [`commands`] - `BotCommand`, `Invocation` and the prefix-based text parser
//! - [`handler`] - executes one invocation and always produces a [`Reply`]
//! - [`reply`] - the embed-like outbound message and its console rendering
//! - [`context`] - shared state: config, store, die source, active sessions
//! - [`sessions`] - in-memory session registry
//! - [`server`] - the event loop that spawns one task per command
//! - [`console`] - stdin/stdout transport
//!
//! ```rust,no_run
//! use rpgmaster::bot::{spawn_console, BotServer};
//! use rpgmaster::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let (inbound, outbound, writer) = spawn_console(&config.console);
//!     let server = BotServer::new(config).await?;
//!     server.run(inbound, outbound).await?;
//!     writer.await?;
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod console;
pub mod context;
pub mod handler;
pub mod help;
pub mod reply;
pub mod server;
pub mod sessions;

pub use commands::{BotCommand, CommandParser, Invocation, UserRef};
pub use console::spawn_console;
pub use context::BotContext;
pub use handler::CommandHandler;
pub use reply::{Reply, ReplyColor, ReplyField};
pub use server::{BotServer, OutgoingReply, TextEvent};
pub use sessions::{ActiveSession, ActiveSessions};
