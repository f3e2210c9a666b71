pub mod conversation;
pub mod message;
pub mod settings;

pub use conversation::Conversation;
pub use message::{Message, NewMessage, Role};
pub use settings::{Theme, UserSettings};
