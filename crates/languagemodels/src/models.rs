use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use languagemodels_ai::labels::is_positive_label;
use languagemodels_ai::scoring::rank_by_score;
use languagemodels_ai::{
    AnswerExtractor, GenerationParams, SentenceEncoder, SentimentModel, TextGenerator,
};
use languagemodels_core::{Config, ExecutionMode, ModelCache, ModelNames, chat_prompt};
use languagemodels_remote::{Completion, TextSynthClient, WikipediaClient};
use tracing::{debug, info};

use crate::{LmError, ModelLoader};

/// Entry point for every task.
///
/// Instruction prompts go to the hosted completion API in
/// [`ExecutionMode::RemoteApi`] and to the local seq2seq model otherwise.
/// Everything else runs on local models, except topic lookup, which always
/// queries Wikipedia.
pub struct LanguageModels {
    config: Config,
    local: Arc<LocalModels>,
    remote: Option<Arc<dyn Completion>>,
    wiki: WikipediaClient,
}

impl LanguageModels {
    /// Handle backed by ONNX Runtime models under `config.model_dir`.
    #[cfg(feature = "onnx")]
    pub fn new(config: Config) -> Self {
        Self::with_loader(config, Arc::new(crate::OnnxLoader))
    }

    pub fn with_loader(config: Config, loader: Arc<dyn ModelLoader>) -> Self {
        let remote: Option<Arc<dyn Completion>> = match &config.mode {
            ExecutionMode::Local => None,
            ExecutionMode::RemoteApi { api_key } => {
                Some(Arc::new(TextSynthClient::new(api_key.clone())))
            }
        };

        let local = LocalModels {
            loader,
            model_dir: config.model_dir.clone(),
            names: config.models.clone(),
            params: GenerationParams {
                max_new_tokens: config.max_new_tokens,
                repetition_penalty: config.repetition_penalty,
            },
            generators: ModelCache::new(),
            encoders: ModelCache::new(),
            readers: ModelCache::new(),
            classifiers: ModelCache::new(),
        };

        info!(mode = config.mode.as_str(), model_dir = %config.model_dir.display(), "language models ready");
        Self {
            config,
            local: Arc::new(local),
            remote,
            wiki: WikipediaClient::new(),
        }
    }

    /// Replace the completion backend. Only consulted in remote mode.
    pub fn with_completion(mut self, backend: Arc<dyn Completion>) -> Self {
        if matches!(self.config.mode, ExecutionMode::RemoteApi { .. }) {
            self.remote = Some(backend);
        }
        self
    }

    /// Replace the Wikipedia client, e.g. to point at another wiki.
    pub fn with_wikipedia(mut self, client: WikipediaClient) -> Self {
        self.wiki = client;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of local model handles loaded so far.
    pub fn loaded_models(&self) -> usize {
        self.local.generators.len()
            + self.local.encoders.len()
            + self.local.readers.len()
            + self.local.classifiers.len()
    }

    /// Complete an instruction prompt.
    pub async fn generate_instruct(&self, prompt: &str) -> Result<String, LmError> {
        if let Some(remote) = &self.remote {
            return Ok(remote
                .complete(prompt, self.config.remote_max_tokens)
                .await?);
        }

        let local = Arc::clone(&self.local);
        let prompt = prompt.to_string();
        Ok(tokio::task::spawn_blocking(move || local.generate(&prompt)).await??)
    }

    /// Reply to a single user message as a truthful, helpful, harmless agent.
    ///
    /// Keeps no history: callers wanting multi-turn context put the prior
    /// turns into `message` (see [`Dialog`](languagemodels_core::Dialog)).
    pub async fn chat(&self, message: &str) -> Result<String, LmError> {
        self.generate_instruct(&chat_prompt(message)).await
    }

    /// Score every document against `query`, best first. Equal scores keep
    /// input order.
    pub async fn rank_documents<S: AsRef<str>>(
        &self,
        query: &str,
        docs: &[S],
    ) -> Result<Vec<(usize, f32)>, LmError> {
        if docs.is_empty() {
            return Err(LmError::NoDocuments);
        }

        let local = Arc::clone(&self.local);
        let query = query.to_string();
        let docs: Vec<String> = docs.iter().map(|d| d.as_ref().to_string()).collect();

        let ranked = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
            let query_emb = local
                .encode(&[query.as_str()])?
                .into_iter()
                .next()
                .context("encoder returned no query vector")?;

            let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
            let doc_embs = local.encode(&doc_refs)?;
            anyhow::ensure!(
                doc_embs.len() == docs.len(),
                "encoder returned {} vectors for {} documents",
                doc_embs.len(),
                docs.len()
            );

            Ok(rank_by_score(&query_emb, &doc_embs))
        })
        .await??;

        Ok(ranked)
    }

    /// The document most similar to `query`, returned verbatim.
    pub async fn search<S: AsRef<str>>(&self, query: &str, docs: &[S]) -> Result<String, LmError> {
        let ranked = self.rank_documents(query, docs).await?;
        let &(best, score) = ranked.first().ok_or(LmError::NoDocuments)?;
        debug!(best, score, "semantic search");
        Ok(docs[best].as_ref().to_string())
    }

    /// Summary of the best Wikipedia article for `topic`, if any.
    pub async fn get_wiki(&self, topic: &str) -> Result<Option<String>, LmError> {
        Ok(self.wiki.summary(topic).await?)
    }

    /// The span of `context` that answers `question`.
    pub async fn extract_answer(&self, question: &str, context: &str) -> Result<String, LmError> {
        let local = Arc::clone(&self.local);
        let question = question.to_string();
        let context = context.to_string();
        Ok(tokio::task::spawn_blocking(move || local.extract(&question, &context)).await??)
    }

    /// Whether the sentiment model's top label for `text` is "positive".
    pub async fn is_positive(&self, text: &str) -> Result<bool, LmError> {
        let local = Arc::clone(&self.local);
        let text = text.to_string();
        let label = tokio::task::spawn_blocking(move || local.top_label(&text)).await??;
        debug!(label = %label, "sentiment");
        Ok(is_positive_label(&label))
    }
}

/// Local model handles, shared with blocking inference tasks.
struct LocalModels {
    loader: Arc<dyn ModelLoader>,
    model_dir: PathBuf,
    names: ModelNames,
    params: GenerationParams,
    generators: ModelCache<Mutex<Box<dyn TextGenerator>>>,
    encoders: ModelCache<Mutex<Box<dyn SentenceEncoder>>>,
    readers: ModelCache<Mutex<Box<dyn AnswerExtractor>>>,
    classifiers: ModelCache<Mutex<Box<dyn SentimentModel>>>,
}

impl LocalModels {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let handle = self.handle(&self.generators, &self.names.generator, |dir| {
            self.loader.load_generator(dir)
        })?;
        let mut model = handle.lock().unwrap_or_else(PoisonError::into_inner);
        model.generate(prompt, self.params)
    }

    fn encode(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let handle = self.handle(&self.encoders, &self.names.embedder, |dir| {
            self.loader.load_encoder(dir)
        })?;
        let mut model = handle.lock().unwrap_or_else(PoisonError::into_inner);
        model.encode(texts)
    }

    fn extract(&self, question: &str, context: &str) -> anyhow::Result<String> {
        let handle = self.handle(&self.readers, &self.names.reader, |dir| {
            self.loader.load_reader(dir)
        })?;
        let mut model = handle.lock().unwrap_or_else(PoisonError::into_inner);
        model.extract(question, context)
    }

    fn top_label(&self, text: &str) -> anyhow::Result<String> {
        let handle = self.handle(&self.classifiers, &self.names.sentiment, |dir| {
            self.loader.load_sentiment(dir)
        })?;
        let mut model = handle.lock().unwrap_or_else(PoisonError::into_inner);
        model.top_label(text)
    }

    fn handle<T: ?Sized>(
        &self,
        cache: &ModelCache<Mutex<Box<T>>>,
        name: &str,
        load: impl FnOnce(&Path) -> anyhow::Result<Box<T>>,
    ) -> anyhow::Result<Arc<Mutex<Box<T>>>> {
        cache.get_or_load(name, || {
            let dir = self.model_dir.join(name);
            info!(model = name, dir = %dir.display(), "loading model");
            load(&dir)
                .with_context(|| format!("load model {name}"))
                .map(Mutex::new)
        })
    }
}
