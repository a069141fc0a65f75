// src/notify/telegram.rs

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::Transport;

/// Bot API transport. One attempt per send, bounded by the timeout;
/// retry policy is deliberately out of scope (best effort).
#[derive(Clone)]
pub struct TelegramTransport {
    token: String,
    client: Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

impl TelegramTransport {
    pub fn new(token: String, client: Client, timeout: Duration) -> Self {
        Self {
            token,
            client,
            timeout,
        }
    }

    pub(crate) fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.token)
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        self.client
            .post(self.api_url("sendMessage"))
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("sendMessage request failed")?
            .error_for_status()
            .context("sendMessage non-2xx")?;
        Ok(())
    }
}
