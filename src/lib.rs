//! # RPG Master - a game master bot for tabletop role-playing sessions
//!
//! RPG Master answers chat commands for a table of players: it rolls dice, keeps
//! character sheets in a SQLite campaign database, tracks hit points, rolls initiative and
//! attacks, and adds a line of narration when asked.
//!
//! ## Features
//!
//! - **Dice**: `NdM+K` expressions with per-die breakdown and configurable safety caps.
//! - **Character sheets**: D&D 5e style abilities, derived HP and proficiency, scoped per
//!   player and per server.
//! - **Combat helpers**: initiative, attack with critical doubling, clamped damage/healing.
//! - **Sessions**: per-channel session registry, optionally persisted.
//! - **Console transport**: drive the bot from a terminal with the same command text a chat
//!   platform would deliver.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rpgmaster::bot::{spawn_console, BotServer};
//! use rpgmaster::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let (inbound, outbound, _writer) = spawn_console(&config.console);
//!     let server = BotServer::new(config).await?;
//!     server.run(inbound, outbound).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bot`] - command parsing, handlers, replies, the server loop and console transport
//! - [`storage`] - campaign database: sheets, sessions, HP updates
//! - [`dice`] - dice expressions and die sources
//! - [`combat`] - initiative, attack rolls and the HP clamp
//! - [`narration`] - flavor lines for `narrate`
//! - [`config`] - configuration management and validation
//! - [`validation`] - input limits and free-text sanitizing
//! - [`error`] - the crate error type
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Transport     │ ← console (stdin/stdout) or a platform adapter
//! └─────────────────┘
//!          │  TextEvent / OutgoingReply
//! ┌─────────────────┐
//! │   Bot Server    │ ← parse, one task per command, Reply out
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Campaign Store  │ ← SQLite, one connection per operation
//! └─────────────────┘
//! ```

pub mod bot;
pub mod combat;
pub mod config;
pub mod dice;
pub mod error;
pub mod logutil;
pub mod narration;
pub mod storage;
pub mod validation;

pub use error::{RpgError, RpgResult};
