//! Hosted instruction completion via the TextSynth API.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::{RemoteError, USER_AGENT};

pub const DEFAULT_COMPLETIONS_URL: &str =
    "https://api.textsynth.com/v1/engines/flan_t5_xxl/completions";

/// A remote text completion backend.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, RemoteError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
}

/// Bearer-authenticated client for a TextSynth completions endpoint.
pub struct TextSynthClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl TextSynthClient {
    pub fn new(api_key: String) -> Self {
        Self::with_url(api_key, DEFAULT_COMPLETIONS_URL.to_string())
    }

    /// Client for a specific completions endpoint URL.
    pub fn with_url(api_key: String, url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }

    /// Use a preconfigured HTTP client (proxy, timeouts, TLS roots).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Completion for TextSynthClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, RemoteError> {
        info!(url = %self.url, max_tokens, "requesting remote completion");
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&CompletionRequest { prompt, max_tokens })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                return Err(RemoteError::Server {
                    status: status.as_u16(),
                    body,
                });
            }
            Err(e) => return Err(e.into()),
        };

        completion_text(value)
    }
}

/// The `text` field of a completion response. Any other shape, including
/// API error objects, becomes [`RemoteError::Inference`] with the raw JSON.
pub fn completion_text(value: Value) -> Result<String, RemoteError> {
    match value.get("text").and_then(Value::as_str) {
        Some(text) => Ok(text.to_string()),
        None => Err(RemoteError::Inference(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{self, StubServer};
    use serde_json::json;

    #[test]
    fn text_field_extracted() {
        let text = completion_text(json!({ "text": "Paris", "finished": true })).unwrap();
        assert_eq!(text, "Paris");
    }

    #[test]
    fn missing_text_carries_raw_response() {
        let err = completion_text(json!({ "error": "invalid API key" })).unwrap_err();
        match err {
            RemoteError::Inference(raw) => assert!(raw.contains("invalid API key")),
            other => panic!("expected Inference, got {other:?}"),
        }
    }

    #[test]
    fn non_string_text_is_an_error() {
        assert!(matches!(
            completion_text(json!({ "text": 42 })),
            Err(RemoteError::Inference(_))
        ));
    }

    #[tokio::test]
    async fn posts_prompt_with_bearer_token() {
        let server = StubServer::start(vec![(200, r#"{"text":" Paris."}"#.into())]).await;
        let client = TextSynthClient::with_url("secret-key".into(), format!("{}/completions", server.url))
            .with_http_client(stub::client());

        let text = client.complete("Capital of France?", 200).await.unwrap();
        assert_eq!(text, " Paris.");

        let requests = server.requests().await;
        let request = &requests[0];
        assert!(request.starts_with("POST /completions "), "{request}");
        assert!(
            request.to_ascii_lowercase().contains("authorization: bearer secret-key"),
            "{request}"
        );
        assert!(
            request.to_ascii_lowercase().contains(&format!("user-agent: {USER_AGENT}")),
            "{request}"
        );
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let sent: Value = serde_json::from_str(body).unwrap();
        assert_eq!(sent, json!({ "prompt": "Capital of France?", "max_tokens": 200 }));
    }

    #[tokio::test]
    async fn error_json_becomes_inference_error() {
        let server = StubServer::start(vec![(401, r#"{"error":"unauthorized"}"#.into())]).await;
        let client = TextSynthClient::with_url("bad".into(), server.url.clone())
            .with_http_client(stub::client());

        let err = client.complete("hi", 10).await.unwrap_err();
        assert!(matches!(err, RemoteError::Inference(ref raw) if raw.contains("unauthorized")));
        server.requests().await;
    }

    #[tokio::test]
    async fn non_json_failure_reports_status() {
        let server = StubServer::start(vec![(502, "bad gateway".into())]).await;
        let client = TextSynthClient::with_url("k".into(), server.url.clone())
            .with_http_client(stub::client());

        let err = client.complete("hi", 10).await.unwrap_err();
        assert!(matches!(err, RemoteError::Server { status: 502, .. }), "{err:?}");
        server.requests().await;
    }
}
