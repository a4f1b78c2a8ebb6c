//! Explicit runtime configuration.
//!
//! Nothing in the library reads the process environment; the CLI resolves
//! environment variables and flags into a [`Config`] and passes it in.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_GENERATOR: &str = "google/flan-t5-large";
pub const DEFAULT_EMBEDDER: &str = "sentence-transformers/multi-qa-MiniLM-L6-cos-v1";
pub const DEFAULT_READER: &str = "distilbert-base-cased-distilled-squad";
pub const DEFAULT_SENTIMENT: &str = "distilbert-base-uncased-finetuned-sst-2-english";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Where instruction prompts are executed.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Run the seq2seq model from `model_dir` in-process.
    #[default]
    Local,
    /// Send prompts to the hosted completion API with a bearer token.
    RemoteApi { api_key: String },
}

impl ExecutionMode {
    /// Remote mode when a non-empty key is supplied, local otherwise.
    pub fn from_api_key(key: Option<String>) -> Self {
        match key {
            Some(api_key) if !api_key.trim().is_empty() => Self::RemoteApi { api_key },
            _ => Self::Local,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::RemoteApi { .. } => "remote-api",
        }
    }
}

// Keep the bearer token out of logs.
impl fmt::Debug for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("Local"),
            Self::RemoteApi { .. } => f
                .debug_struct("RemoteApi")
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

/// Model identifiers, one per task. Each doubles as the cache key and as the
/// directory name under [`Config::model_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModelNames {
    pub generator: String,
    pub embedder: String,
    pub reader: String,
    pub sentiment: String,
}

impl Default for ModelNames {
    fn default() -> Self {
        Self {
            generator: DEFAULT_GENERATOR.to_string(),
            embedder: DEFAULT_EMBEDDER.to_string(),
            reader: DEFAULT_READER.to_string(),
            sentiment: DEFAULT_SENTIMENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: ExecutionMode,
    pub model_dir: PathBuf,
    pub models: ModelNames,
    /// Token budget for local generation.
    pub max_new_tokens: usize,
    pub repetition_penalty: f32,
    /// Token budget sent to the hosted completion API.
    pub remote_max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Local,
            model_dir: PathBuf::from("models"),
            models: ModelNames::default(),
            max_new_tokens: 128,
            repetition_penalty: 1.2,
            remote_max_tokens: 200,
        }
    }
}

impl Config {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Directory holding the files for model `name`.
    pub fn model_path(&self, name: &str) -> PathBuf {
        self.model_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_stock_models() {
        let cfg = Config::default();
        assert_eq!(cfg.mode, ExecutionMode::Local);
        assert_eq!(cfg.models.generator, "google/flan-t5-large");
        assert_eq!(cfg.max_new_tokens, 128);
        assert_eq!(cfg.remote_max_tokens, 200);
        assert!((cfg.repetition_penalty - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn api_key_selects_mode() {
        assert_eq!(ExecutionMode::from_api_key(None), ExecutionMode::Local);
        assert_eq!(
            ExecutionMode::from_api_key(Some("  ".into())),
            ExecutionMode::Local
        );
        assert_eq!(
            ExecutionMode::from_api_key(Some("secret".into())),
            ExecutionMode::RemoteApi {
                api_key: "secret".into()
            }
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let mode = ExecutionMode::RemoteApi {
            api_key: "sk-very-secret".into(),
        };
        let rendered = format!("{:?}", Config::default().with_mode(mode));
        assert!(!rendered.contains("sk-very-secret"), "{rendered}");
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn model_path_nests_identifier() {
        let cfg = Config::default().with_model_dir("/opt/models");
        assert_eq!(
            cfg.model_path("google/flan-t5-large"),
            PathBuf::from("/opt/models/google/flan-t5-large")
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "mode": { "kind": "remote-api", "api_key": "k" },
            "models": { "reader": "deepset/roberta-base-squad2" },
            "max_new_tokens": 64
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.mode.as_str(), "remote-api");
        assert_eq!(cfg.models.reader, "deepset/roberta-base-squad2");
        assert_eq!(cfg.models.embedder, DEFAULT_EMBEDDER);
        assert_eq!(cfg.max_new_tokens, 64);
        assert_eq!(cfg.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "model_dir": "/tmp/lm" }}"#).unwrap();
        let cfg = Config::from_json_file(file.path()).unwrap();
        assert_eq!(cfg.model_dir, PathBuf::from("/tmp/lm"));
        assert_eq!(cfg.mode, ExecutionMode::Local);
    }

    #[test]
    fn load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = Config::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::from_json_file(Path::new("/nonexistent/lm.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
