use std::path::{Path, PathBuf};

/// Static configuration for a [`crate::runtime::CoreRuntime`].
///
/// The principal (`user_id`) is taken as given; how it was obtained is the
/// front end's concern. `access_token` present means the user is signed in,
/// which switches on the remote half of the settings store.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    /// Base URL of the managed backend (collection store + chat relay).
    pub backend_url: String,
    /// Publishable API key sent with every backend request.
    pub backend_key: String,
    /// Principal whose rows the store operates on.
    pub user_id: String,
    /// Bearer token for the signed-in user, if any.
    pub access_token: Option<String>,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(
        data_dir: P,
        backend_url: impl Into<String>,
        backend_key: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            backend_url: backend_url.into(),
            backend_key: backend_key.into(),
            user_id: user_id.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Whether the configured principal is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}
