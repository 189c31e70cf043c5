use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Completion responses are a few hundred tokens; anything bigger is not ours.
const MAX_RESPONSE_SIZE: usize = 1024 * 1024; // 1MB

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// Body of an OpenAI-compatible `POST /chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl CompletionError {
    /// Transport and HTTP failures are retried; a 200 with an unusable body is
    /// not, since asking again would not change what the provider sends.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Timeout(_)
            | CompletionError::Network(_)
            | CompletionError::HttpStatus(_) => true,
            CompletionError::ResponseTooLarge(_) | CompletionError::Malformed(_) => false,
        }
    }
}

/// A text-generation provider, reduced to one chat-completion call.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns `choices[0].message.content` of the provider's reply.
    async fn complete(&self, request: &ChatRequest) -> Result<String, CompletionError>;
}

/// [`CompletionClient`] for OpenAI-compatible HTTP endpoints.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    timeout: Duration,
}

impl HttpCompletionClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: SecretString,
        timeout: Duration,
    ) -> Self {
        if !base_url.starts_with("https://") {
            tracing::warn!(base_url = %base_url, "Sending API key over a non-HTTPS endpoint");
        }
        Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, CompletionError> {
        let send = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| CompletionError::Timeout(self.timeout))?
            .map_err(CompletionError::Network)?;

        if !response.status().is_success() {
            return Err(CompletionError::HttpStatus(response.status().as_u16()));
        }

        let body = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        let parsed: ChatResponse = serde_json::from_slice(&body)
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| CompletionError::Malformed("missing choices[0].message.content".into()))
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, CompletionError> {
    use futures::StreamExt;

    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(CompletionError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(CompletionError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(CompletionError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hello")],
            max_tokens: 256,
            temperature: 0.1,
            top_p: 0.5,
        }
    }

    fn client(server: &MockServer, timeout: Duration) -> HttpCompletionClient {
        HttpCompletionClient::new(
            reqwest::Client::new(),
            &format!("{}/v1", server.uri()),
            SecretString::from("sk-test"),
            timeout,
        )
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "max_tokens": 256,
                "messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "<summary>好。</summary>"}}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let content = client(&mock_server, Duration::from_secs(5))
            .complete(&request())
            .await
            .unwrap();
        assert_eq!(content, "<summary>好。</summary>");
    }

    #[tokio::test]
    async fn test_http_error_is_retryable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, Duration::from_secs(5))
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::HttpStatus(503)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_content_is_malformed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, Duration::from_secs(5))
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Malformed(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, Duration::from_secs(5))
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "choices": [{"message": {"content": "late"}}]
                    }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, Duration::from_millis(100))
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Timeout(_)));
        assert!(err.is_retryable());
    }
}
