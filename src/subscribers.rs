// src/subscribers.rs
// Subscriber list: JSON array of chat ids. Presence means subscribed;
// there is no unsubscribe path. The primary chat seeds the list so the
// operator always hears from a fresh deployment.

use std::path::PathBuf;

use tokio::fs;
use tokio::sync::Mutex;

use crate::state::write_json_atomic;

pub struct SubscriberStore {
    path: PathBuf,
    primary: i64,
    // Registration is load-modify-save; a /start arriving mid-check
    // must not interleave with another writer.
    write_lock: Mutex<()>,
}

impl SubscriberStore {
    pub fn new(path: PathBuf, primary: i64) -> Self {
        Self {
            path,
            primary,
            write_lock: Mutex::new(()),
        }
    }

    /// Missing or corrupt file defaults to just the primary chat.
    pub async fn load(&self) -> Vec<i64> {
        match fs::read_to_string(&self.path).await {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), "corrupt subscriber list, reseeding: {e}");
                vec![self.primary]
            }),
            Err(_) => vec![self.primary],
        }
    }

    pub async fn save(&self, list: &[i64]) {
        if let Err(e) = write_json_atomic(&self.path, &list).await {
            tracing::warn!(path = %self.path.display(), "failed to persist subscribers: {e:#}");
        }
    }

    /// Add `id` unless already subscribed. Returns whether it was newly
    /// added, which gates the "new subscriber" announcement.
    pub async fn register_if_absent(&self, id: i64) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut list = self.load().await;
        if list.contains(&id) {
            return false;
        }
        list.push(id);
        self.save(&list).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: i64 = 42;

    #[tokio::test]
    async fn missing_file_defaults_to_primary() {
        let dir = tempfile::tempdir().unwrap();
        let store = SubscriberStore::new(dir.path().join("subs.json"), PRIMARY);
        assert_eq!(store.load().await, vec![PRIMARY]);
    }

    #[tokio::test]
    async fn corrupt_file_defaults_to_primary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.json");
        std::fs::write(&path, "[1, oops").unwrap();
        let store = SubscriberStore::new(path, PRIMARY);
        assert_eq!(store.load().await, vec![PRIMARY]);
    }

    #[tokio::test]
    async fn register_is_newly_added_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = SubscriberStore::new(dir.path().join("subs.json"), PRIMARY);
        assert!(store.register_if_absent(7).await);
        assert!(!store.register_if_absent(7).await);
        let list = store.load().await;
        assert_eq!(list, vec![PRIMARY, 7]);
    }

    #[tokio::test]
    async fn registering_primary_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = SubscriberStore::new(dir.path().join("subs.json"), PRIMARY);
        assert!(!store.register_if_absent(PRIMARY).await);
        assert_eq!(store.load().await, vec![PRIMARY]);
    }
}
