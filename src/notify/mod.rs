// src/notify/mod.rs
// Fan-out layer: formats notices and delivers one message per item per
// subscriber. Per-recipient failures are logged and swallowed; a dead
// chat never blocks the rest of the fan-out.

pub mod telegram;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use html_escape::{encode_double_quoted_attribute, encode_text};
use metrics::counter;

use crate::extract::Notice;

/// Outbound delivery seam. The real implementation is Telegram;
/// tests record instead of sending.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()>;
}

pub struct Notifier {
    transport: Arc<dyn Transport>,
    primary_chat: i64,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport>, primary_chat: i64) -> Self {
        Self {
            transport,
            primary_chat,
        }
    }

    /// One message per notice per subscriber, extraction order.
    pub async fn notify_batch(&self, batch: &[Notice], subscribers: &[i64]) {
        for notice in batch {
            let text = format_notice(notice);
            self.broadcast(subscribers, &text).await;
        }
    }

    pub async fn broadcast(&self, subscribers: &[i64], text: &str) {
        for &chat_id in subscribers {
            if let Err(e) = self.transport.send(chat_id, text).await {
                counter!("send_errors_total").increment(1);
                tracing::warn!(chat_id, "send failed: {e:#}");
            }
        }
    }

    pub async fn send_to_primary(&self, text: &str) {
        self.broadcast(&[self.primary_chat], text).await;
    }
}

/// Fixed template: bold title, optional date line, link line. All
/// scraped fields are escaped so markup in a notice title cannot leak
/// into the rendered message.
pub fn format_notice(n: &Notice) -> String {
    let mut msg = format!("🆕 <b>{}</b>", encode_text(&n.title));
    if !n.date.is_empty() {
        msg.push_str(&format!("\n📅 {}", encode_text(&n.date)));
    }
    msg.push_str(&format!(
        "\n🔗 <a href=\"{}\">Leggi avviso completo</a>",
        encode_double_quoted_attribute(&n.link)
    ));
    msg
}

pub fn startup_message(source_url: &str) -> String {
    format!(
        "🎓 <b>Bot avviato con successo.</b>\n✅ Nessun nuovo avviso al momento.\n🔎 Controlla manualmente la pagina:\n{source_url}"
    )
}

pub fn heartbeat_message() -> &'static str {
    "✅ Nessun nuovo avviso nell'ultima ora.\n📡 Bot attivo e in ascolto."
}

pub fn nothing_new_message() -> &'static str {
    "✅ Nessun nuovo avviso al momento."
}

pub fn welcome_message(username: &str) -> String {
    format!(
        "👋 Benvenuto @{}!\n🎓 <b>Bot avviato con successo.</b>",
        encode_text(username)
    )
}

pub fn already_subscribed_message() -> &'static str {
    "✅ Sei già iscritto. Riceverai i nuovi avvisi qui."
}

pub fn new_subscriber_message(username: &str, chat_id: i64) -> String {
    format!(
        "📩 Nuovo utente registrato: @{} ({chat_id})",
        encode_text(username)
    )
}

pub fn refresh_ack_message() -> &'static str {
    "🔄 Controllo avvisi in corso..."
}

pub fn help_message() -> &'static str {
    "Comandi: /start per iscriverti, /refresh per un controllo immediato."
}
