//! Inbound update loop: long-polls Telegram, interprets commands and replies.

use crate::commands::{Command, CommandHandler};
use chessrelay_rust_core::clients::telegram::{TelegramClient, Update};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Sender id, reply chat id and parsed command of a command message
/// addressed to this bot.
pub fn extract_command(update: &Update, bot_username: Option<&str>) -> Option<(i64, i64, Command)> {
    let message = update.message.as_ref()?;
    let from = message.from.as_ref()?.id;
    let command = Command::parse(message.text.as_deref()?, bot_username)?;
    Some((from, message.chat.id, command))
}

pub async fn run_command_loop(
    telegram: TelegramClient,
    handler: CommandHandler,
    mut shutdown: watch::Receiver<bool>,
) {
    let bot_username = loop {
        let me = tokio::select! {
            res = telegram.get_me() => res,
            _ = shutdown.changed() => return,
        };
        match me {
            Ok(user) => break user.username,
            Err(e) => {
                error!("getMe failed: {}", e);
                tokio::select! {
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    _ = shutdown.changed() => return,
                }
            }
        }
    };
    info!(
        "Command loop started as @{}",
        bot_username.as_deref().unwrap_or("<unnamed>")
    );
    let mut offset = 0_i64;

    loop {
        let updates = tokio::select! {
            res = telegram.get_updates(offset) => res,
            _ = shutdown.changed() => break,
        };

        let updates = match updates {
            Ok(u) => u,
            Err(e) => {
                error!("getUpdates failed: {}", e);
                tokio::select! {
                    _ = tokio::time::sleep(ERROR_BACKOFF) => continue,
                    _ = shutdown.changed() => break,
                }
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some((from, chat_id, command)) = extract_command(&update, bot_username.as_deref()) else {
                debug!("Ignoring non-command update {}", update.update_id);
                continue;
            };

            if let Some(reply) = handler.handle(from, command).await {
                if let Err(e) = telegram.send_message(chat_id, &reply).await {
                    warn!("Failed to reply to {}: {}", chat_id, e);
                }
            }
        }
    }
    info!("Command loop stopped");
}
