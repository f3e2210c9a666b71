use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SPEECH_VOICE;

/// UI theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Flat record of per-user preferences.
///
/// Dual-homed: the authoritative copy lives in the remote `settings`
/// collection for signed-in users, and a JSON cache in the data dir always
/// exists for instant load. `#[serde(default)]` keeps old caches readable
/// when fields are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub theme: Theme,
    pub speech_voice: String,
    pub speech_enabled: bool,
    pub send_on_enter: bool,
    pub web_search_enabled: bool,
    pub code_execution_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            speech_voice: DEFAULT_SPEECH_VOICE.to_string(),
            speech_enabled: false,
            send_on_enter: true,
            web_search_enabled: true,
            code_execution_enabled: true,
        }
    }
}
