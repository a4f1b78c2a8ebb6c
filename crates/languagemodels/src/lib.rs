//! Text generation, semantic search, question answering, sentiment and topic
//! lookup behind one handle.
//!
//! [`LanguageModels`] owns the configuration, the model caches and the
//! remote clients. Local models load on first use and stay loaded for the
//! life of the handle.

mod error;
pub mod loader;
mod models;

pub use error::LmError;
pub use loader::ModelLoader;
#[cfg(feature = "onnx")]
pub use loader::OnnxLoader;
pub use models::LanguageModels;

pub use languagemodels_ai::{
    AnswerExtractor, GenerationParams, SentenceEncoder, SentimentModel, TextGenerator,
};
pub use languagemodels_core::{Config, Dialog, ExecutionMode, ModelNames, chat_prompt};
pub use languagemodels_remote::{Completion, RemoteError, WikipediaClient};
