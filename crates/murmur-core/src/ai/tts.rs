//! Speech synthesis client.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};

use crate::constants::{MAX_SPEECH_TEXT_LEN, SPEECH_API_BASE};
use crate::error::{Error, Result};

/// Truncate text to the synthesis limit, on a char boundary.
pub fn truncate_for_speech(text: &str) -> String {
    text.chars().take(MAX_SPEECH_TEXT_LEN).collect()
}

pub struct SpeechClient {
    base_url: String,
    client: reqwest::Client,
}

impl SpeechClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, SPEECH_API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Generate audio for `text` with the given voice.
    /// Returns the audio bytes (MP3 format); over-long text is truncated
    /// before submission.
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let text = truncate_for_speech(text);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("voice", voice), ("text", text.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, message });
        }

        let audio_bytes = response.bytes().await?.to_vec();
        Ok(audio_bytes)
    }

    /// Base64 transport form, for callers that embed audio in JSON.
    pub async fn synthesize_base64(&self, text: &str, voice: &str) -> Result<String> {
        let audio = self.synthesize(text, voice).await?;
        Ok(BASE64_STANDARD.encode(audio))
    }
}
