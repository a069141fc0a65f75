// src/bot.rs
// Inbound command surface: a getUpdates long-poll loop. Poll failures
// are logged and retried; the loop never exits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::checker::{Checker, RunKind};
use crate::notify::telegram::TelegramTransport;
use crate::notify::{
    already_subscribed_message, help_message, new_subscriber_message, refresh_ack_message,
    welcome_message, Notifier,
};
use crate::subscribers::SubscriberStore;

/// Long-poll window requested from the API. The HTTP timeout in
/// `poll_updates` must stay above this.
const POLL_WINDOW_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
    username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Subscribe,
    Refresh,
    Help,
}

impl Command {
    /// `/start@SomeBot args` still counts as `/start`.
    pub fn parse(text: &str) -> Command {
        let head = text
            .trim()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .split('@')
            .next()
            .unwrap_or_default();
        match head {
            "/start" => Command::Subscribe,
            "/refresh" => Command::Refresh,
            _ => Command::Help,
        }
    }
}

pub async fn run_update_loop(
    transport: TelegramTransport,
    notifier: Arc<Notifier>,
    subscribers: Arc<SubscriberStore>,
    checker: Arc<Checker>,
) {
    // Starting at 0 replays Telegram's retained backlog after a
    // restart; stale commands get harmless re-answers. Accepted.
    let mut offset: i64 = 0;
    loop {
        match poll_updates(&transport, offset).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let Some(msg) = update.message else { continue };
                    handle_message(msg, &notifier, &subscribers, &checker).await;
                }
            }
            Err(e) => {
                tracing::warn!("getUpdates failed: {e:#}");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

async fn poll_updates(transport: &TelegramTransport, offset: i64) -> Result<Vec<Update>> {
    let resp: UpdatesResponse = transport
        .client()
        .get(transport.api_url("getUpdates"))
        .query(&[("offset", offset), ("timeout", POLL_WINDOW_SECS as i64)])
        .timeout(Duration::from_secs(POLL_WINDOW_SECS + 5))
        .send()
        .await
        .context("getUpdates request failed")?
        .error_for_status()
        .context("getUpdates non-2xx")?
        .json()
        .await
        .context("getUpdates body was not valid JSON")?;
    Ok(resp.result)
}

async fn handle_message(
    msg: Message,
    notifier: &Arc<Notifier>,
    subscribers: &Arc<SubscriberStore>,
    checker: &Arc<Checker>,
) {
    let chat_id = msg.chat.id;
    let username = msg.chat.username.as_deref().unwrap_or("utente");
    let text = msg.text.unwrap_or_default();

    match Command::parse(&text) {
        Command::Subscribe => {
            if subscribers.register_if_absent(chat_id).await {
                tracing::info!(chat_id, username, "new subscriber");
                notifier
                    .broadcast(&[chat_id], &welcome_message(username))
                    .await;
                notifier
                    .send_to_primary(&new_subscriber_message(username, chat_id))
                    .await;
            } else {
                notifier
                    .broadcast(&[chat_id], already_subscribed_message())
                    .await;
            }
        }
        Command::Refresh => {
            notifier.broadcast(&[chat_id], refresh_ack_message()).await;
            // Off the poll loop, so a slow fetch can't stall polling.
            let checker = Arc::clone(checker);
            tokio::spawn(async move {
                checker.run_check(RunKind::Manual).await;
            });
        }
        Command::Help => {
            notifier.broadcast(&[chat_id], help_message()).await;
        }
    }
}
