// src/source.rs

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;

use crate::extract::{extract_notices, Notice};

#[async_trait]
pub trait NoticeSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Notice>>;
    fn name(&self) -> &'static str;
}

/// Fetches the avvisi page over HTTP and runs the extractor on the body.
pub struct HttpNoticeSource {
    url: String,
    origin: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpNoticeSource {
    pub fn new(url: String, origin: String, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            url,
            origin,
            client,
            timeout,
        }
    }
}

#[async_trait]
impl NoticeSource for HttpNoticeSource {
    async fn fetch_latest(&self) -> Result<Vec<Notice>> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("fetching {}", self.url))?
            .error_for_status()
            .context("avvisi page returned non-2xx")?;

        let body = resp.text().await.context("reading avvisi page body")?;
        let items = extract_notices(&body, &self.origin);
        counter!("notices_extracted_total").increment(items.len() as u64);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "avvisi"
    }
}
