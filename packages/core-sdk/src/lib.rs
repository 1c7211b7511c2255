pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod selector;
pub mod server;
pub mod settings;
pub mod telemetry;

#[cfg(test)]
mod testing;

/**
 * \brief Common re-exports for SDK consumers.
 */
pub mod prelude {
    pub use crate::client::{Backend, ChatClient, ChatSession};
    pub use crate::config::ServerConfig;
    pub use crate::error::ChatError;
    pub use crate::llm::Provider;
    pub use crate::models::{ChatMessage, ProviderCredentials, Role, Vendor};
    pub use crate::selector::{select, ProviderDefaults};
    pub use crate::settings::{Settings, SettingsStore};
}
