//! Conversation cache synchronized against the authoritative remote store.
//!
//! The cache is a newest-first mirror of the principal's conversations plus
//! the current selection. Every mutation goes remote-first; the cache only
//! changes once the store has confirmed, and `remove` finishes with a full
//! refresh to absorb concurrent writers.

use std::sync::Arc;

use crate::error::Result;
use crate::models::Conversation;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::store::CollectionStore;

pub struct ConversationStore {
    store: Arc<dyn CollectionStore>,
    retry: RetryPolicy,
    user_id: String,
    conversations: Vec<Conversation>,
    selected: Option<String>,
}

impl ConversationStore {
    pub fn new(store: Arc<dyn CollectionStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
            user_id: user_id.into(),
            conversations: Vec::new(),
            selected: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Defensive copy of the cached list, newest first.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.conversations.clone()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<Conversation> {
        let selected = self.selected.as_deref()?;
        self.conversations.iter().find(|c| c.id == selected).cloned()
    }

    /// Point the selection at a cached conversation. Returns false if the id
    /// is not in the cache (selection unchanged).
    pub fn select(&mut self, id: &str) -> bool {
        if self.conversations.iter().any(|c| c.id == id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Replace the cache with the authoritative list. A selection that no
    /// longer resolves is dropped; if nothing is selected afterwards the
    /// newest conversation becomes current.
    pub async fn refresh(&mut self) -> Result<()> {
        let store = Arc::clone(&self.store);
        let user_id = self.user_id.clone();
        let list = retry_with_backoff(&self.retry, None, move || {
            let store = Arc::clone(&store);
            let user_id = user_id.clone();
            async move { store.list_conversations(&user_id).await }
        })
        .await?;

        self.conversations = list;
        if let Some(selected) = self.selected.as_deref() {
            if !self.conversations.iter().any(|c| c.id == selected) {
                self.selected = None;
            }
        }
        if self.selected.is_none() {
            self.selected = self.conversations.first().map(|c| c.id.clone());
        }
        Ok(())
    }

    /// Insert remotely; on success the new conversation lands at the front
    /// of the cache and is selected. On failure the cache is untouched.
    pub async fn create(&mut self, title: &str) -> Result<Conversation> {
        let store = Arc::clone(&self.store);
        let user_id = self.user_id.clone();
        let title = title.to_string();
        let created = retry_with_backoff(&self.retry, None, move || {
            let store = Arc::clone(&store);
            let user_id = user_id.clone();
            let title = title.clone();
            async move { store.insert_conversation(&user_id, &title).await }
        })
        .await?;

        self.conversations.insert(0, created.clone());
        self.selected = Some(created.id.clone());
        Ok(created)
    }

    /// Delete remotely first: if that fails the cache is untouched and the
    /// error propagates. On success the entry is dropped locally and, if it
    /// was selected, the selection moves to the entry now at the same index,
    /// else the one before it, else the first, else nothing. A full refresh
    /// then corrects any drift from concurrent writers.
    pub async fn remove(&mut self, id: &str) -> Result<()> {
        let store = Arc::clone(&self.store);
        let user_id = self.user_id.clone();
        let target = id.to_string();
        retry_with_backoff(&self.retry, None, move || {
            let store = Arc::clone(&store);
            let user_id = user_id.clone();
            let target = target.clone();
            async move { store.delete_conversation(&user_id, &target).await }
        })
        .await?;

        if let Some(index) = self.conversations.iter().position(|c| c.id == id) {
            self.conversations.remove(index);
            if self.selected.as_deref() == Some(id) {
                self.selected = self
                    .conversations
                    .get(index)
                    .or_else(|| index.checked_sub(1).and_then(|i| self.conversations.get(i)))
                    .or_else(|| self.conversations.first())
                    .map(|c| c.id.clone());
            }
        }

        self.refresh().await
    }

    /// Delete every conversation of the principal, messages first.
    ///
    /// Message cleanup is best effort: a failure there is logged and
    /// conversation deletion is still attempted. A conversation-level
    /// failure is fatal: the error propagates and the cache is untouched.
    pub async fn remove_all(&mut self) -> Result<()> {
        let store = Arc::clone(&self.store);
        let user_id = self.user_id.clone();
        let messages_result = retry_with_backoff(&self.retry, None, move || {
            let store = Arc::clone(&store);
            let user_id = user_id.clone();
            async move { store.delete_all_messages(&user_id).await }
        })
        .await;
        if let Err(err) = messages_result {
            tracing::warn!(error = %err, "message cleanup failed, deleting conversations anyway");
        }

        let store = Arc::clone(&self.store);
        let user_id = self.user_id.clone();
        retry_with_backoff(&self.retry, None, move || {
            let store = Arc::clone(&store);
            let user_id = user_id.clone();
            async move { store.delete_all_conversations(&user_id).await }
        })
        .await?;

        self.conversations.clear();
        self.selected = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::store::testing::{MockStore, ALWAYS_FAIL};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        }
    }

    fn store_over(mock: &Arc<MockStore>) -> ConversationStore {
        ConversationStore::new(Arc::clone(mock) as Arc<dyn CollectionStore>, "u1")
            .with_retry_policy(fast_retry())
    }

    #[tokio::test]
    async fn test_refresh_selects_newest_when_nothing_selected() {
        let mock = Arc::new(MockStore::seeded(&["A", "B", "C"]));
        let mut conversations = store_over(&mock);

        conversations.refresh().await.unwrap();
        assert_eq!(conversations.conversations().len(), 3);
        assert_eq!(conversations.selected_id(), Some("c0"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_valid_selection() {
        let mock = Arc::new(MockStore::seeded(&["A", "B", "C"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();
        assert!(conversations.select("c2"));

        conversations.refresh().await.unwrap();
        assert_eq!(conversations.selected_id(), Some("c2"));
    }

    #[tokio::test]
    async fn test_refresh_drops_vanished_selection() {
        let mock = Arc::new(MockStore::seeded(&["A", "B"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();
        assert!(conversations.select("c1"));

        // Another session deleted c1 remotely.
        mock.conversations.lock().retain(|c| c.id != "c1");
        conversations.refresh().await.unwrap();
        assert_eq!(conversations.selected_id(), Some("c0"));
    }

    #[tokio::test]
    async fn test_create_prepends_and_selects() {
        let mock = Arc::new(MockStore::seeded(&["A"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();

        let created = conversations.create("fresh").await.unwrap();
        let cached = conversations.conversations();
        assert_eq!(cached[0].id, created.id);
        assert_eq!(conversations.selected_id(), Some(created.id.as_str()));
    }

    #[tokio::test]
    async fn test_create_failure_leaves_cache_untouched() {
        let mock = Arc::new(MockStore::seeded(&["A"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();

        mock.insert_conversation_failures
            .store(ALWAYS_FAIL, Ordering::SeqCst);
        assert!(conversations.create("doomed").await.is_err());
        assert_eq!(conversations.conversations().len(), 1);
        assert_eq!(conversations.selected_id(), Some("c0"));
    }

    #[tokio::test]
    async fn test_concurrent_creates_select_last_writer() {
        let mock = Arc::new(MockStore::new());
        let mut conversations = store_over(&mock);

        conversations.create("first").await.unwrap();
        let second = conversations.create("second").await.unwrap();
        assert_eq!(conversations.selected_id(), Some(second.id.as_str()));
    }

    #[tokio::test]
    async fn test_remove_selected_prefers_next_at_same_index() {
        let mock = Arc::new(MockStore::seeded(&["A", "B", "C"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();
        assert!(conversations.select("c1"));

        conversations.remove("c1").await.unwrap();
        assert_eq!(conversations.selected_id(), Some("c2"));
        assert_eq!(conversations.conversations().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_selected_falls_back_to_previous() {
        let mock = Arc::new(MockStore::seeded(&["A", "B"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();
        assert!(conversations.select("c1"));

        conversations.remove("c1").await.unwrap();
        assert_eq!(conversations.selected_id(), Some("c0"));
    }

    #[tokio::test]
    async fn test_remove_only_conversation_clears_selection() {
        let mock = Arc::new(MockStore::seeded(&["A"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();
        assert_eq!(conversations.selected_id(), Some("c0"));

        conversations.remove("c0").await.unwrap();
        assert_eq!(conversations.selected_id(), None);
        assert!(conversations.conversations().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unselected_keeps_selection() {
        let mock = Arc::new(MockStore::seeded(&["A", "B", "C"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();
        assert_eq!(conversations.selected_id(), Some("c0"));

        conversations.remove("c2").await.unwrap();
        assert_eq!(conversations.selected_id(), Some("c0"));
        assert_eq!(conversations.conversations().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_fail_fast_leaves_cache_untouched() {
        let mock = Arc::new(MockStore::seeded(&["A", "B"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();

        mock.delete_conversation_failures
            .store(ALWAYS_FAIL, Ordering::SeqCst);
        assert!(conversations.remove("c0").await.is_err());
        assert_eq!(conversations.conversations().len(), 2);
        assert_eq!(conversations.selected_id(), Some("c0"));
    }

    #[tokio::test]
    async fn test_remove_all_tolerates_message_cleanup_failure() {
        let mock = Arc::new(MockStore::seeded(&["A", "B"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();

        mock.delete_messages_failures
            .store(ALWAYS_FAIL, Ordering::SeqCst);
        conversations.remove_all().await.unwrap();
        assert!(conversations.conversations().is_empty());
        assert_eq!(conversations.selected_id(), None);
        assert!(mock.conversations.lock().is_empty());
    }

    #[tokio::test]
    async fn test_remove_all_propagates_conversation_failure() {
        let mock = Arc::new(MockStore::seeded(&["A", "B"]));
        let mut conversations = store_over(&mock);
        conversations.refresh().await.unwrap();

        mock.delete_all_conversations_failures
            .store(ALWAYS_FAIL, Ordering::SeqCst);
        assert!(conversations.remove_all().await.is_err());
        assert_eq!(conversations.conversations().len(), 2);
        assert_eq!(conversations.selected_id(), Some("c0"));
    }
}
