pub mod conversations;
pub mod remote;
pub mod settings;

pub use conversations::ConversationStore;
pub use remote::{CollectionStore, HttpStore};
pub use settings::SettingsStore;

#[cfg(test)]
pub(crate) mod testing;
