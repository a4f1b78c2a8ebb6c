use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The completion API answered without a `text` field. Carries the raw
    /// response.
    #[error("TextSynth error: {0}")]
    Inference(String),
}
