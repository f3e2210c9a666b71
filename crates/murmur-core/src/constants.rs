//! Application-wide constants
//!
//! Centralized location for service endpoints and limits that are used
//! across multiple modules.

/// Public Piston endpoint for sandboxed code execution.
pub const PISTON_API_BASE: &str = "https://emkc.org/api/v2/piston";

/// DuckDuckGo instant-answer endpoint (primary search provider).
pub const DUCKDUCKGO_API_BASE: &str = "https://api.duckduckgo.com";

/// Wikipedia opensearch endpoint (fallback search provider).
pub const WIKIPEDIA_API_BASE: &str = "https://en.wikipedia.org/w/api.php";

/// StreamElements speech-synthesis endpoint.
pub const SPEECH_API_BASE: &str = "https://api.streamelements.com/kappa/v2/speech";

/// Default voice for speech synthesis.
pub const DEFAULT_SPEECH_VOICE: &str = "Brian";

/// Longest text submitted for synthesis; anything longer is truncated.
pub const MAX_SPEECH_TEXT_LEN: usize = 3000;

// Sandbox ceilings (milliseconds), passed with every execution request
pub const SANDBOX_COMPILE_TIMEOUT_MS: u64 = 10_000;
pub const SANDBOX_RUN_TIMEOUT_MS: u64 = 3_000;

/// Delay before a failed queue head is drained again.
pub const DRAIN_RETRY_DELAY_MS: u64 = 5_000;

/// Most results returned from a single web search.
pub const MAX_SEARCH_RESULTS: usize = 5;

// Conversation defaults
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";
/// Characters of the first message used to derive a conversation title.
pub const TITLE_PREVIEW_LEN: usize = 50;

/// Settings cache filename inside the data dir.
pub const SETTINGS_CACHE_FILE: &str = "settings.json";
