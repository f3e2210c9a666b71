use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message inside a conversation, as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for inserting a message; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub user_id: String,
    pub role: Role,
    pub content: String,
}
