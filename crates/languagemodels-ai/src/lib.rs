//! AI inference layer: task traits, scoring helpers, and ONNX Runtime models.
//!
//! The traits are what callers hold; the `onnx` feature provides the real
//! implementations. Tests and alternative backends can supply their own.

pub mod labels;
pub mod scoring;

#[cfg(feature = "onnx")]
mod embedder;
#[cfg(feature = "onnx")]
mod generator;
#[cfg(feature = "onnx")]
mod reader;
#[cfg(feature = "onnx")]
mod sentiment;
#[cfg(feature = "onnx")]
mod session;

#[cfg(feature = "onnx")]
pub use embedder::Embedder;
#[cfg(feature = "onnx")]
pub use generator::Seq2SeqGenerator;
#[cfg(feature = "onnx")]
pub use reader::Reader;
#[cfg(feature = "onnx")]
pub use sentiment::SentimentClassifier;

/// Generation settings shared by local text generators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    pub repetition_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 128,
            repetition_penalty: 1.2,
        }
    }
}

/// Prompt in, text out.
pub trait TextGenerator: Send {
    fn generate(&mut self, prompt: &str, params: GenerationParams) -> anyhow::Result<String>;
}

/// Sentence embeddings for similarity scoring.
pub trait SentenceEncoder: Send {
    /// One vector per input, in input order.
    fn encode(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Extractive question answering over a context passage.
pub trait AnswerExtractor: Send {
    /// The answer span, always a substring of `context` (possibly empty).
    fn extract(&mut self, question: &str, context: &str) -> anyhow::Result<String>;
}

/// Text classification returning the top label name.
pub trait SentimentModel: Send {
    fn top_label(&mut self, text: &str) -> anyhow::Result<String>;
}
