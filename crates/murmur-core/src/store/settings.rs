//! Dual-homed user settings.
//!
//! A JSON cache in the data dir gives instant load; for a signed-in user the
//! remote record is authoritative and overwrites the cache once fetched.
//! Reads are best effort (an unreachable backend falls back to the cache);
//! writes are not, and propagate their errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::constants::SETTINGS_CACHE_FILE;
use crate::error::Result;
use crate::models::UserSettings;
use crate::store::CollectionStore;

pub struct SettingsStore {
    store: Arc<dyn CollectionStore>,
    cache_path: PathBuf,
    /// Principal for the remote half; None means local-only operation.
    user_id: Option<String>,
    settings: UserSettings,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn CollectionStore>, data_dir: &Path, user_id: Option<String>) -> Self {
        Self {
            store,
            cache_path: data_dir.join(SETTINGS_CACHE_FILE),
            user_id,
            settings: UserSettings::default(),
        }
    }

    pub fn current(&self) -> UserSettings {
        self.settings.clone()
    }

    /// Local cache first, then the remote copy wins for a signed-in user.
    pub async fn load(&mut self) -> UserSettings {
        if let Some(cached) = self.read_cache() {
            self.settings = cached;
        }
        if let Some(user_id) = self.user_id.clone() {
            match self.store.fetch_settings(&user_id).await {
                Ok(Some(remote)) => {
                    self.settings = remote;
                    if let Err(err) = self.write_cache() {
                        tracing::warn!(error = %err, "failed to refresh settings cache");
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "remote settings unavailable, using cached");
                }
            }
        }
        self.settings.clone()
    }

    /// Persist to the local cache and, when signed in, the remote record.
    pub async fn save(&mut self, settings: UserSettings) -> Result<()> {
        self.settings = settings;
        self.write_cache()?;
        if let Some(user_id) = self.user_id.clone() {
            self.store.upsert_settings(&user_id, &self.settings).await?;
        }
        Ok(())
    }

    /// Mutate-and-save convenience for single-field updates.
    pub async fn update(&mut self, mutate: impl FnOnce(&mut UserSettings)) -> Result<UserSettings> {
        let mut settings = self.settings.clone();
        mutate(&mut settings);
        self.save(settings).await?;
        Ok(self.settings.clone())
    }

    fn read_cache(&self) -> Option<UserSettings> {
        let text = std::fs::read_to_string(&self.cache_path).ok()?;
        match serde_json::from_str(&text) {
            Ok(settings) => Some(settings),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable settings cache");
                None
            }
        }
    }

    fn write_cache(&self) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&self.cache_path, text)?;
        Ok(())
    }
}
