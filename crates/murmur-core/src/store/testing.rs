//! In-memory [`CollectionStore`] used by unit tests across the crate.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::models::{Conversation, Message, NewMessage, UserSettings};
use crate::store::CollectionStore;

/// Failure counters: 0 = succeed, [`ALWAYS_FAIL`] = fail forever, any other
/// value fails that many times then succeeds.
pub(crate) const ALWAYS_FAIL: u32 = u32::MAX;

#[derive(Default)]
pub(crate) struct MockStore {
    pub conversations: Mutex<Vec<Conversation>>,
    pub messages: Mutex<Vec<Message>>,
    pub remote_settings: Mutex<Option<UserSettings>>,
    pub upserted_settings: Mutex<Vec<UserSettings>>,
    next_id: AtomicU32,
    pub insert_conversation_failures: AtomicU32,
    pub delete_conversation_failures: AtomicU32,
    pub delete_all_conversations_failures: AtomicU32,
    pub insert_message_failures: AtomicU32,
    pub delete_messages_failures: AtomicU32,
    pub fetch_settings_failures: AtomicU32,
}

fn unavailable() -> Error {
    Error::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with conversations `c0..cN`, `c0` newest.
    pub fn seeded(titles: &[&str]) -> Self {
        let now = Utc::now();
        let conversations = titles
            .iter()
            .enumerate()
            .map(|(index, title)| {
                let stamp = now - Duration::minutes(index as i64);
                Conversation {
                    id: format!("c{index}"),
                    user_id: "u1".to_string(),
                    title: (*title).to_string(),
                    created_at: stamp,
                    updated_at: stamp,
                }
            })
            .collect();
        Self {
            conversations: Mutex::new(conversations),
            ..Self::default()
        }
    }

    fn take_failure(counter: &AtomicU32) -> Result<()> {
        loop {
            let current = counter.load(Ordering::SeqCst);
            if current == 0 {
                return Ok(());
            }
            if current == ALWAYS_FAIL {
                return Err(unavailable());
            }
            if counter
                .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Err(unavailable());
            }
        }
    }
}

#[async_trait]
impl CollectionStore for MockStore {
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let mut rows: Vec<Conversation> = self
            .conversations
            .lock()
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_conversation(&self, user_id: &str, title: &str) -> Result<Conversation> {
        Self::take_failure(&self.insert_conversation_failures)?;
        let row = Conversation {
            id: format!("g{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.conversations.lock().insert(0, row.clone());
        Ok(row)
    }

    async fn delete_conversation(&self, user_id: &str, id: &str) -> Result<()> {
        Self::take_failure(&self.delete_conversation_failures)?;
        self.conversations
            .lock()
            .retain(|row| !(row.user_id == user_id && row.id == id));
        Ok(())
    }

    async fn delete_all_conversations(&self, user_id: &str) -> Result<()> {
        Self::take_failure(&self.delete_all_conversations_failures)?;
        self.conversations.lock().retain(|row| row.user_id != user_id);
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .messages
            .lock()
            .iter()
            .filter(|row| row.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        Self::take_failure(&self.insert_message_failures)?;
        let row = Message {
            id: format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            conversation_id: message.conversation_id.clone(),
            user_id: message.user_id.clone(),
            role: message.role,
            content: message.content.clone(),
            created_at: Utc::now(),
        };
        self.messages.lock().push(row.clone());
        Ok(row)
    }

    async fn delete_all_messages(&self, user_id: &str) -> Result<()> {
        Self::take_failure(&self.delete_messages_failures)?;
        self.messages.lock().retain(|row| row.user_id != user_id);
        Ok(())
    }

    async fn fetch_settings(&self, _user_id: &str) -> Result<Option<UserSettings>> {
        Self::take_failure(&self.fetch_settings_failures)?;
        Ok(self.remote_settings.lock().clone())
    }

    async fn upsert_settings(&self, _user_id: &str, settings: &UserSettings) -> Result<()> {
        *self.remote_settings.lock() = Some(settings.clone());
        self.upserted_settings.lock().push(settings.clone());
        Ok(())
    }
}
