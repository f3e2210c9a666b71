//! Message send flow.
//!
//! Composes the conversation cache, the collection store, the outbound queue
//! and the chat relay into one operation: make sure a conversation exists,
//! persist the user's message, get the assistant's reply, persist that too.
//! Transient persistence failures defer the write to the queue instead of
//! failing the send; relay refusals (auth, billing, throttling) surface
//! unchanged.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::ai::ChatRelayClient;
use crate::constants::{DEFAULT_CONVERSATION_TITLE, TITLE_PREVIEW_LEN};
use crate::error::{Error, Result};
use crate::models::{Message, NewMessage, Role};
use crate::queue::RequestQueue;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::store::{CollectionStore, ConversationStore};

/// What happened to a send.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The relay replied; both sides of the exchange are persisted.
    Replied {
        conversation_id: String,
        reply: String,
    },
    /// The user message could not be persisted right now and sits in the
    /// outbound queue; no reply yet.
    Deferred {
        conversation_id: String,
        queued_id: String,
    },
}

/// Derive a conversation title from its first message.
fn derive_title(content: &str) -> String {
    let preview: String = content.chars().take(TITLE_PREVIEW_LEN).collect();
    let preview = preview.trim();
    if preview.is_empty() {
        DEFAULT_CONVERSATION_TITLE.to_string()
    } else {
        preview.to_string()
    }
}

pub struct ChatService {
    conversations: Arc<Mutex<ConversationStore>>,
    store: Arc<dyn CollectionStore>,
    relay: ChatRelayClient,
    queue: RequestQueue,
    retry: RetryPolicy,
    user_id: String,
}

impl ChatService {
    pub fn new(
        conversations: Arc<Mutex<ConversationStore>>,
        store: Arc<dyn CollectionStore>,
        relay: ChatRelayClient,
        queue: RequestQueue,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            conversations,
            store,
            relay,
            queue,
            retry: RetryPolicy::default(),
            user_id: user_id.into(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send one user message in the currently selected conversation,
    /// creating a conversation when none is selected.
    pub async fn send(&self, content: &str) -> Result<SendOutcome> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::InvalidInput("empty message".to_string()));
        }

        let conversation_id = {
            let mut conversations = self.conversations.lock().await;
            match conversations.selected_id() {
                Some(id) => id.to_string(),
                None => conversations.create(&derive_title(content)).await?.id,
            }
        };

        let user_message = NewMessage {
            conversation_id: conversation_id.clone(),
            user_id: self.user_id.clone(),
            role: Role::User,
            content: content.to_string(),
        };

        // Persist the user's side first. A transient failure defers the
        // write to the outbound queue instead of failing the send.
        match self.store.insert_message(&user_message).await {
            Ok(_) => {}
            Err(err) if err.is_retryable() => {
                tracing::info!(error = %err, "deferring message write to the outbound queue");
                let queued_id = self.enqueue_insert(user_message);
                return Ok(SendOutcome::Deferred {
                    conversation_id,
                    queued_id,
                });
            }
            Err(err) => return Err(err),
        }

        let reply = retry_with_backoff(&self.retry, None, || {
            self.relay.invoke(content, Some(&conversation_id))
        })
        .await?;

        let assistant_message = NewMessage {
            conversation_id: reply.conversation_id.clone(),
            user_id: self.user_id.clone(),
            role: Role::Assistant,
            content: reply.response.clone(),
        };
        if let Err(err) = self.store.insert_message(&assistant_message).await {
            if err.is_retryable() {
                self.enqueue_insert(assistant_message);
            } else {
                return Err(err);
            }
        }

        Ok(SendOutcome::Replied {
            conversation_id: reply.conversation_id,
            reply: reply.response,
        })
    }

    /// Messages of one conversation, oldest first.
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<Message>> {
        self.store.list_messages(conversation_id).await
    }

    fn enqueue_insert(&self, message: NewMessage) -> String {
        let store = Arc::clone(&self.store);
        self.queue.add(Arc::new(move || {
            let store = Arc::clone(&store);
            let message = message.clone();
            Box::pin(async move { store.insert_message(&message).await.map(|_| ()) })
        }))
    }
}
