use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat conversation as stored in the remote collection store.
///
/// The store assigns `id` and both timestamps on insert; the local cache
/// only ever mirrors rows it got back from the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
