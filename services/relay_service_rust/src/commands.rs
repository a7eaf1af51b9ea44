//! Chat command interpreter: `/start`, `/stop`, `/subs`, `/ml`, `/sm`, `/help`.

use chessrelay_rust_core::models::SubscriberId;
use chessrelay_rust_core::relay::{MaintenanceTrigger, NotificationDedup, SubscriberDirectory};
use std::sync::Arc;
use tracing::{info, warn};

pub const START_TEXT: &str = "Use this bot to get link of games of Chesswahili team members that are actively playing on Lichess. Type /stop to stop receiving notifications";
pub const STOP_TEXT: &str =
    "Sorry to see you leave You wont be receiving notifications. Type /start to receive";
pub const UNKNOWN_TEXT: &str = "I don't know that command";
pub const HELP_TEXT: &str = "Commands for this bot are:

/start  start the bot (i.e., enable receiving of the game links)
/stop   stop the bot (i.e., disable receiving of the game links)
/subs   subscribers for the bot
/ml     current map length
/help   this help text
/sm     send maintenance message (bot owner only)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Subscribers,
    MapLength,
    Maintenance,
    Help,
    Unknown(String),
}

impl Command {
    /// Parse a chat message. Non-command text yields `None`.
    ///
    /// Accepts the `/cmd@BotName` form Telegram uses in group chats, but only
    /// when `BotName` is `bot_username`; commands addressed to other bots are
    /// ignored.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let word = text.trim().split_whitespace().next()?;
        let word = word.strip_prefix('/')?;
        let name = match word.split_once('@') {
            Some((name, target)) => {
                let me = bot_username?;
                if !target.eq_ignore_ascii_case(me) {
                    return None;
                }
                name
            }
            None => word,
        };
        if name.is_empty() {
            return None;
        }

        Some(match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "subs" => Command::Subscribers,
            "ml" => Command::MapLength,
            "sm" => Command::Maintenance,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        })
    }
}

pub struct CommandHandler {
    directory: Arc<dyn SubscriberDirectory>,
    maintenance: Arc<MaintenanceTrigger>,
    dedup: Arc<NotificationDedup>,
    master_id: SubscriberId,
}

impl CommandHandler {
    pub fn new(
        directory: Arc<dyn SubscriberDirectory>,
        maintenance: Arc<MaintenanceTrigger>,
        dedup: Arc<NotificationDedup>,
        master_id: SubscriberId,
    ) -> Self {
        Self {
            directory,
            maintenance,
            dedup,
            master_id,
        }
    }

    /// Run `command` for `from` and return the reply, if any.
    ///
    /// Directory failures are logged; the user still gets the usual reply.
    pub async fn handle(&self, from: SubscriberId, command: Command) -> Option<String> {
        match command {
            Command::Start => {
                if let Err(e) = self.directory.activate(from).await {
                    warn!("Failed to activate subscriber {}: {}", from, e);
                } else {
                    info!("Subscriber {} activated", from);
                }
                Some(START_TEXT.to_string())
            }
            Command::Stop => {
                if let Err(e) = self.directory.deactivate(from).await {
                    warn!("Failed to deactivate subscriber {}: {}", from, e);
                } else {
                    info!("Subscriber {} deactivated", from);
                }
                Some(STOP_TEXT.to_string())
            }
            Command::Subscribers => {
                let count = self.directory.count_active().await.unwrap_or_else(|e| {
                    warn!("Failed to count subscribers: {}", e);
                    0
                });
                Some(format!("There are {} subscribers in chesswahiliBot", count))
            }
            Command::MapLength => Some(format!(
                "There are {} in a map so far.",
                self.dedup.len()
            )),
            Command::Maintenance => {
                if from == self.master_id {
                    self.maintenance.trigger();
                } else {
                    warn!("Ignoring maintenance request from unauthorized user {}", from);
                }
                None
            }
            Command::Help => Some(HELP_TEXT.to_string()),
            Command::Unknown(name) => {
                info!("Unknown command /{} from {}", name, from);
                Some(UNKNOWN_TEXT.to_string())
            }
        }
    }
}
