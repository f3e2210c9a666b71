pub mod ai;
pub mod chat;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod models;
pub mod queue;
pub mod retry;
pub mod runtime;
pub mod sandbox;
pub mod search;
pub mod store;
pub mod websearch;

// Re-export the types most front ends need at the crate root.
pub use config::CoreConfig;
pub use error::{Error, Result};
pub use runtime::CoreRuntime;
