pub mod relay;
pub mod tts;

pub use relay::{ChatRelayClient, ChatReply};
pub use tts::SpeechClient;
