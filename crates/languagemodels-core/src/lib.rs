pub mod cache;
pub mod config;
pub mod prompt;

pub use cache::ModelCache;
pub use config::{Config, ConfigError, ExecutionMode, ModelNames};
pub use prompt::{Dialog, chat_prompt};
