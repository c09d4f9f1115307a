//! Chat-completions provider implementation.
//!
//! Works with any endpoint that accepts `{"messages": [{role, content}, ...]}`
//! and answers with `choices[0].message.content`: OpenAI, OpenRouter,
//! Ollama, llama.cpp server, vLLM, and self-hosted relays.

use async_trait::async_trait;
use minebrain_core::{ConversationEntry, InferenceError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A provider that POSTs the conversation to a chat completions URL.
pub struct ChatCompletionsProvider {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    model: Option<String>,
    client: reqwest::Client,
}

impl ChatCompletionsProvider {
    /// Create a provider for the full completions URL (including the path).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::NotConfigured(format!("HTTP client: {e}")))?;

        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(InferenceError::NotConfigured("empty endpoint URL".into()));
        }

        Ok(Self {
            name: "chat-completions".into(),
            endpoint,
            api_key: None,
            model: None,
            client,
        })
    }

    /// Build from the `[inference]` config section.
    pub fn from_config(config: &minebrain_config::InferenceConfig) -> Result<Self, InferenceError> {
        let mut provider = Self::new(&config.endpoint, Duration::from_secs(config.timeout_secs))?;
        provider.api_key = config.api_key.clone();
        provider.model = config.model.clone();
        Ok(provider)
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Send a `model` field with every request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body<'a>(&'a self, messages: &'a [ConversationEntry]) -> ApiRequest<'a> {
        ApiRequest {
            model: self.model.as_deref(),
            messages: messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
        }
    }

    /// Pull `choices[0].message.content` out of a response body.
    fn extract_content(body: &str) -> Result<String, InferenceError> {
        let api_response: ApiResponse = serde_json::from_str(body)
            .map_err(|e| InferenceError::MalformedResponse(format!("invalid JSON: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::MalformedResponse("no choices in response".into()))?;

        choice.message.content.ok_or_else(|| {
            InferenceError::MalformedResponse("choices[0].message.content is missing".into())
        })
    }
}

#[async_trait]
impl minebrain_core::Provider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, messages: &[ConversationEntry]) -> Result<String, InferenceError> {
        let body = self.request_body(messages);

        debug!(
            provider = %self.name,
            endpoint = %self.endpoint,
            messages = messages.len(),
            "Sending completion request"
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(e.to_string())
            } else {
                InferenceError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(InferenceError::Status {
                status_code: status,
                message: "invalid API key or insufficient permissions".into(),
            });
        }

        if status == 429 {
            return Err(InferenceError::Status {
                status_code: status,
                message: "rate limited".into(),
            });
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Completion endpoint returned error");
            return Err(InferenceError::Status {
                status_code: status,
                message: error_body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;
        Self::extract_content(&text)
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use minebrain_core::Provider;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one HTTP response on a local port and hand back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let content_length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + content_length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&raw).to_string());
        });

        (url, rx)
    }

    fn conversation() -> Vec<ConversationEntry> {
        vec![
            ConversationEntry::system("grammar"),
            ConversationEntry::system("Players Info:\n-- Unknown --"),
            ConversationEntry::user("Steve: hello"),
        ]
    }

    #[test]
    fn request_body_omits_model_when_unset() {
        let provider = ChatCompletionsProvider::new("http://x/v1/chat/completions", Duration::from_secs(5)).unwrap();
        let messages = conversation();
        let json = serde_json::to_value(provider.request_body(&messages)).unwrap();
        assert!(json.get("model").is_none());
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][2]["content"], "Steve: hello");
    }

    #[test]
    fn request_body_carries_model() {
        let provider = ChatCompletionsProvider::new("http://x", Duration::from_secs(5))
            .unwrap()
            .with_model("llama3");
        let json = serde_json::to_value(provider.request_body(&[])).unwrap();
        assert_eq!(json["model"], "llama3");
    }

    #[test]
    fn empty_endpoint_is_not_configured() {
        let err = ChatCompletionsProvider::new(" ", Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, InferenceError::NotConfigured(_)));
    }

    #[test]
    fn extract_content_reads_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"SAY hi"}},{"message":{"content":"other"}}]}"#;
        assert_eq!(ChatCompletionsProvider::extract_content(body).unwrap(), "SAY hi");
    }

    #[test]
    fn extract_content_rejects_missing_fields() {
        for body in [
            r#"{"choices":[]}"#,
            r#"{"result":"SAY hi"}"#,
            r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
            "not json",
        ] {
            let err = ChatCompletionsProvider::extract_content(body).unwrap_err();
            assert!(matches!(err, InferenceError::MalformedResponse(_)), "{body}");
        }
    }

    #[tokio::test]
    async fn complete_posts_messages_and_returns_content() {
        let (url, request) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"SAY hello"}}]}"#,
        )
        .await;
        let provider = ChatCompletionsProvider::new(url, Duration::from_secs(5))
            .unwrap()
            .with_api_key("sk-test");

        let reply = provider.complete(&conversation()).await.unwrap();
        assert_eq!(reply, "SAY hello");

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /v1/chat/completions"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        assert!(raw.contains(r#""content":"Steve: hello""#));
    }

    #[tokio::test]
    async fn complete_maps_server_error_to_status() {
        let (url, _request) = serve_once("502 Bad Gateway", r#"{"error":"upstream down"}"#).await;
        let provider = ChatCompletionsProvider::new(url, Duration::from_secs(5)).unwrap();

        let err = provider.complete(&conversation()).await.unwrap_err();
        match err {
            InferenceError::Status { status_code, message } => {
                assert_eq!(status_code, 502);
                assert!(message.contains("upstream down"));
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_reports_unreachable_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());
        drop(listener);

        let provider = ChatCompletionsProvider::new(url, Duration::from_secs(5)).unwrap();
        let err = provider.complete(&conversation()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Network(_)));
    }
}
