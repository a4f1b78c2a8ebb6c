//! How local models are turned into handles.

use std::path::Path;

use languagemodels_ai::{AnswerExtractor, SentenceEncoder, SentimentModel, TextGenerator};

/// Builds a model handle from its directory. Called at most once per model
/// identifier per [`LanguageModels`](crate::LanguageModels).
pub trait ModelLoader: Send + Sync {
    fn load_generator(&self, dir: &Path) -> anyhow::Result<Box<dyn TextGenerator>>;
    fn load_encoder(&self, dir: &Path) -> anyhow::Result<Box<dyn SentenceEncoder>>;
    fn load_reader(&self, dir: &Path) -> anyhow::Result<Box<dyn AnswerExtractor>>;
    fn load_sentiment(&self, dir: &Path) -> anyhow::Result<Box<dyn SentimentModel>>;
}

/// Loads ONNX exports through ONNX Runtime.
#[cfg(feature = "onnx")]
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxLoader;

#[cfg(feature = "onnx")]
impl ModelLoader for OnnxLoader {
    fn load_generator(&self, dir: &Path) -> anyhow::Result<Box<dyn TextGenerator>> {
        Ok(Box::new(languagemodels_ai::Seq2SeqGenerator::load(dir)?))
    }

    fn load_encoder(&self, dir: &Path) -> anyhow::Result<Box<dyn SentenceEncoder>> {
        Ok(Box::new(languagemodels_ai::Embedder::load(dir)?))
    }

    fn load_reader(&self, dir: &Path) -> anyhow::Result<Box<dyn AnswerExtractor>> {
        Ok(Box::new(languagemodels_ai::Reader::load(dir)?))
    }

    fn load_sentiment(&self, dir: &Path) -> anyhow::Result<Box<dyn SentimentModel>> {
        Ok(Box::new(languagemodels_ai::SentimentClassifier::load(dir)?))
    }
}
