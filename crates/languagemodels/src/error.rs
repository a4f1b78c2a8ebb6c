use languagemodels_remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmError {
    #[error("search needs at least one candidate document")]
    NoDocuments,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Model loading or inference failed.
    #[error("model error: {0:#}")]
    Model(#[from] anyhow::Error),

    #[error("inference task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
