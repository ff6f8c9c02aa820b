//! Terminal transport: stdin lines become [`TextEvent`]s, replies print to stdout.
//!
//! Lines starting with `:` switch the identity used for the following commands:
//! `:user <id> [display name]`, `:server <id>`, `:channel <id>`, `:whoami`.
//! EOF closes the inbound channel, which stops the server.

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ConsoleConfig;

use super::commands::UserRef;
use super::server::{OutgoingReply, TextEvent};

/// Who the next console line is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleIdentity {
    pub user: UserRef,
    pub server_id: String,
    pub channel_id: String,
}

impl From<&ConsoleConfig> for ConsoleIdentity {
    fn from(cfg: &ConsoleConfig) -> Self {
        Self {
            user: UserRef::new(cfg.user_id.clone(), cfg.display_name.clone()),
            server_id: cfg.server_id.clone(),
            channel_id: cfg.channel_id.clone(),
        }
    }
}

/// Result of feeding one input line to the console.
#[derive(Debug, PartialEq)]
pub enum ConsoleInput {
    Event(TextEvent),
    /// Local feedback, not sent to the server.
    Notice(String),
    Skip,
}

impl ConsoleIdentity {
    /// Apply a `:` directive or wrap the line as a text event.
    pub fn accept(&mut self, line: &str) -> ConsoleInput {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleInput::Skip;
        }
        let Some(directive) = line.strip_prefix(':') else {
            return ConsoleInput::Event(TextEvent {
                user: self.user.clone(),
                server_id: self.server_id.clone(),
                channel_id: self.channel_id.clone(),
                content: line.to_string(),
            });
        };
        let mut parts = directive.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next().map(str::trim).unwrap_or_default();
        match (verb.as_str(), arg) {
            ("whoami", _) => ConsoleInput::Notice(self.describe()),
            ("user", arg) if !arg.is_empty() => {
                let (id, name) = match arg.split_once(char::is_whitespace) {
                    Some((id, name)) => (id, name.trim()),
                    None => (arg, arg),
                };
                self.user = UserRef::new(id, name);
                ConsoleInput::Notice(self.describe())
            }
            ("server", arg) if !arg.is_empty() => {
                self.server_id = arg.to_string();
                ConsoleInput::Notice(self.describe())
            }
            ("channel", arg) if !arg.is_empty() => {
                self.channel_id = arg.to_string();
                ConsoleInput::Notice(self.describe())
            }
            _ => ConsoleInput::Notice(
                "console directives: :user <id> [name], :server <id>, :channel <id>, :whoami"
                    .to_string(),
            ),
        }
    }

    fn describe(&self) -> String {
        format!(
            "you are {} ({}) in {}/#{}",
            self.user.display_name, self.user.id, self.server_id, self.channel_id
        )
    }
}

/// Spawn the stdin reader and stdout writer. Returns the channel ends for
/// [`super::BotServer::run`] plus the writer task handle.
pub fn spawn_console(
    config: &ConsoleConfig,
) -> (
    mpsc::UnboundedReceiver<TextEvent>,
    mpsc::UnboundedSender<OutgoingReply>,
    JoinHandle<()>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<TextEvent>();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<OutgoingReply>();
    let mut identity = ConsoleIdentity::from(config);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match identity.accept(&line) {
                    ConsoleInput::Event(event) => {
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                    ConsoleInput::Notice(text) => println!("{text}"),
                    ConsoleInput::Skip => {}
                },
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    break;
                }
            }
        }
    });

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(out) = reply_rx.recv().await {
            let text = format!(
                "[#{} → {}]\n{}\n\n",
                out.channel_id,
                out.reply_to,
                out.reply.render_text()
            );
            if stdout.write_all(text.as_bytes()).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    (event_rx, reply_tx, writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ConsoleIdentity {
        ConsoleIdentity::from(&ConsoleConfig::default())
    }

    #[test]
    fn plain_lines_become_events() {
        let mut id = identity();
        let ConsoleInput::Event(event) = id.accept("  /roll 1d20  ") else {
            panic!("expected event");
        };
        assert_eq!(event.content, "/roll 1d20");
        assert_eq!(event.user.id, "console");
        assert_eq!(event.channel_id, "table");
        assert_eq!(id.accept("   "), ConsoleInput::Skip);
    }

    #[test]
    fn directives_switch_identity() {
        let mut id = identity();
        assert!(matches!(id.accept(":user p2 Borin Ironfist"), ConsoleInput::Notice(_)));
        assert_eq!(id.user.id, "p2");
        assert_eq!(id.user.display_name, "Borin Ironfist");
        id.accept(":channel tavern");
        id.accept(":server guild-9");
        let ConsoleInput::Event(event) = id.accept("/list-sheets") else {
            panic!("expected event");
        };
        assert_eq!(
            (event.server_id.as_str(), event.channel_id.as_str()),
            ("guild-9", "tavern")
        );
        let ConsoleInput::Notice(help) = id.accept(":bogus") else {
            panic!("expected notice");
        };
        assert!(help.contains(":whoami"));
    }
}
