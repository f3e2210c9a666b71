//! Remote collection store.
//!
//! The managed backend exposes conversations, messages and per-user settings
//! as REST collections. [`CollectionStore`] is the seam everything above
//! consumes; [`HttpStore`] is the production implementation, speaking a
//! PostgREST-style dialect (`/rest/v1/{table}` with `eq.`/`order` query
//! parameters and an `apikey` + bearer header pair). Row-level authorization
//! is the backend's job; the `user_id` filters here only scope queries.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Conversation, Message, NewMessage, UserSettings};

/// Typed operations the rest of the core performs against the remote store.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Conversations of one principal, newest first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>>;
    async fn insert_conversation(&self, user_id: &str, title: &str) -> Result<Conversation>;
    async fn delete_conversation(&self, user_id: &str, id: &str) -> Result<()>;
    async fn delete_all_conversations(&self, user_id: &str) -> Result<()>;

    /// Messages of one conversation, oldest first.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;
    async fn insert_message(&self, message: &NewMessage) -> Result<Message>;
    async fn delete_all_messages(&self, user_id: &str) -> Result<()>;

    async fn fetch_settings(&self, user_id: &str) -> Result<Option<UserSettings>>;
    async fn upsert_settings(&self, user_id: &str, settings: &UserSettings) -> Result<()>;
}

#[derive(Debug, Clone, Serialize)]
struct NewConversationRow<'a> {
    user_id: &'a str,
    title: &'a str,
}

/// Settings live in a one-row-per-user table keyed by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsRow {
    user_id: String,
    #[serde(flatten)]
    settings: UserSettings,
}

pub struct HttpStore {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token,
            client,
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(Error::Api { status, message })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let response = self
            .authed(self.client.get(self.rest_url(table)).query(query))
            .send()
            .await?;
        let rows = Self::check(response).await?.json().await?;
        Ok(rows)
    }

    /// Insert one row and return it as stored (id and timestamps assigned
    /// by the backend).
    async fn insert_returning<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        row: &B,
    ) -> Result<T> {
        let response = self
            .authed(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;
        let mut rows: Vec<T> = Self::check(response).await?.json().await?;
        rows.pop()
            .ok_or_else(|| Error::Other(format!("insert into '{table}' returned no row")))
    }

    async fn delete_where(&self, table: &str, query: &[(&str, &str)]) -> Result<()> {
        let response = self
            .authed(self.client.delete(self.rest_url(table)).query(query))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CollectionStore for HttpStore {
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let filter = format!("eq.{user_id}");
        self.select(
            "conversations",
            &[
                ("select", "*"),
                ("user_id", &filter),
                ("order", "created_at.desc"),
            ],
        )
        .await
    }

    async fn insert_conversation(&self, user_id: &str, title: &str) -> Result<Conversation> {
        self.insert_returning("conversations", &NewConversationRow { user_id, title })
            .await
    }

    async fn delete_conversation(&self, user_id: &str, id: &str) -> Result<()> {
        let id_filter = format!("eq.{id}");
        let user_filter = format!("eq.{user_id}");
        self.delete_where("conversations", &[("id", &id_filter), ("user_id", &user_filter)])
            .await
    }

    async fn delete_all_conversations(&self, user_id: &str) -> Result<()> {
        let filter = format!("eq.{user_id}");
        self.delete_where("conversations", &[("user_id", &filter)]).await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let filter = format!("eq.{conversation_id}");
        self.select(
            "messages",
            &[
                ("select", "*"),
                ("conversation_id", &filter),
                ("order", "created_at.asc"),
            ],
        )
        .await
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        self.insert_returning("messages", message).await
    }

    async fn delete_all_messages(&self, user_id: &str) -> Result<()> {
        let filter = format!("eq.{user_id}");
        self.delete_where("messages", &[("user_id", &filter)]).await
    }

    async fn fetch_settings(&self, user_id: &str) -> Result<Option<UserSettings>> {
        let filter = format!("eq.{user_id}");
        let rows: Vec<SettingsRow> = self
            .select("settings", &[("select", "*"), ("user_id", &filter)])
            .await?;
        Ok(rows.into_iter().next().map(|row| row.settings))
    }

    async fn upsert_settings(&self, user_id: &str, settings: &UserSettings) -> Result<()> {
        let row = SettingsRow {
            user_id: user_id.to_string(),
            settings: settings.clone(),
        };
        let response = self
            .authed(
                self.client
                    .post(self.rest_url("settings"))
                    .query(&[("on_conflict", "user_id")]),
            )
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
