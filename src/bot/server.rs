//! Event loop: text events in, replies out, one task per command.
//!
//! A transport feeds [`TextEvent`]s into an unbounded channel and drains
//! [`OutgoingReply`]s from another. The server parses each event, spawns a task that runs
//! the command against the shared [`BotContext`], and stops on Ctrl-C or when the inbound
//! channel closes. In-flight commands are awaited before [`BotServer::run`] returns.

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, trace, warn};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::logutil::escape_log;
use crate::storage::CampaignStore;

use super::commands::{CommandParser, Invocation, UserRef};
use super::context::BotContext;
use super::handler::CommandHandler;
use super::reply::Reply;

/// One line of chat from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub user: UserRef,
    pub server_id: String,
    pub channel_id: String,
    pub content: String,
}

/// A reply addressed to the channel the command came from.
#[derive(Debug, Clone)]
pub struct OutgoingReply {
    pub channel_id: String,
    pub reply_to: String,
    pub reply: Reply,
}

pub struct BotServer {
    ctx: Arc<BotContext>,
    parser: CommandParser,
}

impl BotServer {
    /// Open the store named in `config` and build a server around it.
    pub async fn new(config: Config) -> Result<Self> {
        let busy_timeout = std::time::Duration::from_millis(config.storage.busy_timeout_ms);
        let store = CampaignStore::open_with_timeout(config.storage.db_path(), busy_timeout).await?;
        Ok(Self::from_context(Arc::new(BotContext::new(config, store))))
    }

    pub fn from_context(ctx: Arc<BotContext>) -> Self {
        let parser = CommandParser::new(ctx.config.bot.command_prefix.clone());
        Self { ctx, parser }
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    /// Turn a text event into an invocation, or an immediate error reply when it is a
    /// malformed command. Plain chatter yields `None`.
    pub fn interpret(&self, event: TextEvent) -> Option<Result<Invocation, OutgoingReply>> {
        let parsed = self.parser.parse(&event.content)?;
        Some(match parsed {
            Ok(command) => Ok(Invocation {
                user: event.user,
                server_id: event.server_id,
                channel_id: event.channel_id,
                command,
            }),
            Err(e) => {
                debug!(
                    "Unparseable command from {}: '{}' ({})",
                    event.user.id,
                    escape_log(&event.content),
                    e
                );
                Err(OutgoingReply {
                    channel_id: event.channel_id,
                    reply_to: event.user.id,
                    reply: Reply::from_error(&e),
                })
            }
        })
    }

    /// Run until Ctrl-C or until `inbound` closes.
    pub async fn run(
        &self,
        mut inbound: mpsc::UnboundedReceiver<TextEvent>,
        outbound: mpsc::UnboundedSender<OutgoingReply>,
    ) -> Result<()> {
        info!("{} is listening for commands", self.ctx.config.bot.name);
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                event = inbound.recv() => {
                    let Some(event) = event else {
                        info!("Inbound channel closed");
                        break;
                    };
                    trace!("event from {}: '{}'", event.user.id, escape_log(&event.content));
                    match self.interpret(event) {
                        None => {}
                        Some(Err(reply)) => send(&outbound, reply),
                        Some(Ok(inv)) => {
                            let ctx = Arc::clone(&self.ctx);
                            let outbound = outbound.clone();
                            tasks.spawn(async move {
                                let reply = CommandHandler::handle(&ctx, &inv).await;
                                send(&outbound, OutgoingReply {
                                    channel_id: inv.channel_id,
                                    reply_to: inv.user.id,
                                    reply,
                                });
                            });
                        }
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        warn!("command task ended abnormally: {e}");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }
        self.shutdown(tasks).await;
        Ok(())
    }

    async fn shutdown(&self, mut tasks: JoinSet<()>) {
        info!("Shutting down, {} command(s) in flight", tasks.len());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("command task ended abnormally: {e}");
            }
        }
        info!(
            "Shutdown complete ({} session(s) were still open)",
            self.ctx.sessions.len()
        );
    }
}

fn send(outbound: &mpsc::UnboundedSender<OutgoingReply>, reply: OutgoingReply) {
    if outbound.send(reply).is_err() {
        warn!("Reply dropped: transport is gone");
    }
}
