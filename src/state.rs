// src/state.rs
// Seen-state persistence. Read failures fall back to the default,
// write failures are logged and swallowed; neither is ever fatal.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeenState {
    /// Links of the latest extraction pass. Replaced wholesale on each
    /// successful pass, never merged: links that drop off the page age
    /// out and count as new if they reappear.
    #[serde(default)]
    pub seen: Vec<String>,
    /// When the last outbound event (delivered batch, startup notice,
    /// or heartbeat) went out. None until the first run completes.
    #[serde(default)]
    pub last_event_ts: Option<DateTime<Utc>>,
}

pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Missing or corrupt state is an empty state, not an error.
    pub async fn load(&self) -> SeenState {
        match fs::read_to_string(&self.path).await {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), "corrupt seen state, starting empty: {e}");
                SeenState::default()
            }),
            Err(_) => SeenState::default(),
        }
    }

    /// Atomic replace: write a sibling temp file, then rename over the
    /// target.
    pub async fn save(&self, state: &SeenState) {
        if let Err(e) = write_json_atomic(&self.path, state).await {
            tracing::warn!(path = %self.path.display(), "failed to persist seen state: {e:#}");
        }
    }
}

pub(crate) async fn write_json_atomic<T: Serialize>(
    path: &std::path::Path,
    value: &T,
) -> anyhow::Result<()> {
    use anyhow::Context;

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).await.context("creating state dir")?;
        }
    }
    let body = serde_json::to_vec_pretty(value).context("serializing state")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &body).await.context("writing temp state file")?;
    fs::rename(&tmp, path).await.context("renaming temp state file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen.json"));
        assert_eq!(store.load().await, SeenState::default());
    }

    #[tokio::test]
    async fn corrupt_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = SeenStore::new(path);
        assert_eq!(store.load().await, SeenState::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("nested").join("seen.json"));
        let state = SeenState {
            seen: vec!["https://x/1".into(), "https://x/2".into()],
            last_event_ts: Some(Utc.with_ymd_and_hms(2025, 10, 10, 12, 0, 0).unwrap()),
        };
        store.save(&state).await;
        assert_eq!(store.load().await, state);
    }

    #[tokio::test]
    async fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen.json"));
        store
            .save(&SeenState {
                seen: vec!["https://x/old".into()],
                last_event_ts: None,
            })
            .await;
        store
            .save(&SeenState {
                seen: vec!["https://x/new".into()],
                last_event_ts: None,
            })
            .await;
        assert_eq!(store.load().await.seen, vec!["https://x/new".to_string()]);
    }
}
