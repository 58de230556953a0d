// http.rs — HttpGenerator: a MessageGenerator over a hosted model endpoint.
//
// Speaks either the Anthropic Messages wire format or an OpenAI-compatible
// chat-completions format, chosen by `GeneratorConfig::provider`. Both take
// the same request body; they differ in auth header and response shape.
//
// Failure classification:
//   transient: 408, 429, 5xx (incl. 529 overloaded), client timeout,
//              connection failures, body read failures
//   permanent: any other non-2xx, undecodable or empty response bodies,
//              requests that cannot be built

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::{GeneratorConfig, Provider};
use crate::error::{ConfigError, GenerationError};
use crate::generator::MessageGenerator;

/// Longest slice of an error body kept in a failure reason.
const MAX_ERROR_BODY: usize = 300;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Generator backed by an HTTP completion endpoint.
pub struct HttpGenerator {
    client: Client,
    config: GeneratorConfig,
    api_key: Option<String>,
}

impl HttpGenerator {
    /// Build a generator from config. The API key, if any, is read from the
    /// environment variable named by `api_key_env`.
    pub fn new(config: GeneratorConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("cannot build HTTP client: {}", e)))?;
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::debug!(endpoint = %config.endpoint, "no API key configured");
        }
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Override the key resolved from the environment.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn request(&self, prompt: &str, max_tokens: u32) -> reqwest::blocking::RequestBuilder {
        let body = CompletionRequest {
            model: &self.config.model,
            max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let mut request = self.client.post(&self.config.endpoint).json(&body);
        match self.config.provider {
            Provider::AnthropicMessages => {
                if let Some(version) = &self.config.anthropic_version {
                    request = request.header("anthropic-version", version);
                }
                if let Some(key) = &self.api_key {
                    request = request.header("x-api-key", key);
                }
            }
            Provider::OpenAiChat => {
                if let Some(key) = &self.api_key {
                    request = request.bearer_auth(key);
                }
            }
        }
        request
    }
}

impl MessageGenerator for HttpGenerator {
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let response = self
            .request(prompt, max_tokens)
            .send()
            .map_err(|e| classify_transport(&e))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| GenerationError::transient(format!("reading response body: {}", e)))?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        extract_text(self.config.provider, &body)
    }

    fn name(&self) -> &str {
        match self.config.provider {
            Provider::AnthropicMessages => "anthropic-messages",
            Provider::OpenAiChat => "openai-chat",
        }
    }
}

/// Classify a non-success HTTP status.
pub fn classify_status(status: StatusCode, body: &str) -> GenerationError {
    let reason = format!("HTTP {}: {}", status.as_u16(), truncate(body.trim()));
    let transient = status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error();
    if transient {
        GenerationError::Transient { reason }
    } else {
        GenerationError::Permanent { reason }
    }
}

/// Classify a request that never produced a response.
fn classify_transport(error: &reqwest::Error) -> GenerationError {
    if error.is_builder() {
        GenerationError::permanent(format!("invalid request: {}", error))
    } else if error.is_timeout() {
        GenerationError::transient(format!("request timed out: {}", error))
    } else {
        GenerationError::transient(format!("request failed: {}", error))
    }
}

/// Pull the generated text out of a success body.
pub fn extract_text(provider: Provider, body: &str) -> Result<String, GenerationError> {
    let decode_error = |e: serde_json::Error| {
        GenerationError::permanent(format!("undecodable response: {}", e))
    };
    let text = match provider {
        Provider::AnthropicMessages => {
            let response: MessagesResponse = serde_json::from_str(body).map_err(decode_error)?;
            response
                .content
                .into_iter()
                .find(|block| block.kind == "text" || block.kind.is_empty())
                .and_then(|block| block.text)
        }
        Provider::OpenAiChat => {
            let response: ChatCompletionResponse =
                serde_json::from_str(body).map_err(decode_error)?;
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
        }
    };

    match text.map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(GenerationError::permanent("response contained no text")),
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn throttling_and_unavailability_are_transient() {
        for code in [408, 429, 500, 502, 503, 504, 529] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(
                classify_status(status, "slow down").is_transient(),
                "{code} should be transient"
            );
        }
    }

    #[test]
    fn request_problems_are_permanent() {
        for code in [400, 401, 403, 404, 413, 422] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(
                !classify_status(status, "nope").is_transient(),
                "{code} should be permanent"
            );
        }
    }

    #[test]
    fn status_reason_includes_truncated_body() {
        let body = "x".repeat(1000);
        let err = classify_status(StatusCode::BAD_REQUEST, &body);
        let GenerationError::Permanent { reason } = err else {
            panic!("expected permanent");
        };
        assert!(reason.starts_with("HTTP 400: "));
        assert!(reason.len() < 400);
    }

    #[test]
    fn extracts_anthropic_text_block() {
        let body = r#"{
            "id": "msg_1",
            "type": "message",
            "content": [{"type": "text", "text": "  Keep going!  "}],
            "stop_reason": "end_turn"
        }"#;
        assert_eq!(
            extract_text(Provider::AnthropicMessages, body).unwrap(),
            "Keep going!"
        );
    }

    #[test]
    fn extracts_openai_choice() {
        let body = r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "You got this."}}]}"#;
        assert_eq!(
            extract_text(Provider::OpenAiChat, body).unwrap(),
            "You got this."
        );
    }

    #[test]
    fn empty_content_is_permanent() {
        let err = extract_text(Provider::AnthropicMessages, r#"{"content": []}"#).unwrap_err();
        assert!(!err.is_transient());

        let blank = r#"{"choices": [{"message": {"content": "  "}}]}"#;
        let err = extract_text(Provider::OpenAiChat, blank).unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn malformed_body_is_permanent() {
        let err = extract_text(Provider::AnthropicMessages, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, GenerationError::Permanent { .. }));
    }

    #[test]
    fn connection_refused_is_transient() {
        // Grab a free port, then close it so nothing is listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = GeneratorConfig {
            endpoint: format!("http://127.0.0.1:{}/v1/messages", port),
            api_key_env: None,
            timeout_secs: 2,
            ..GeneratorConfig::default()
        };
        let generator = HttpGenerator::new(config).unwrap();

        let err = generator.generate("hello", 50).unwrap_err();
        assert!(err.is_transient(), "got {err:?}");
    }

    #[test]
    fn request_timeout_is_transient() {
        // Accepts the connection and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            std::thread::sleep(std::time::Duration::from_secs(3));
            drop(stream);
        });

        let config = GeneratorConfig {
            endpoint: format!("http://127.0.0.1:{}/v1/messages", port),
            api_key_env: None,
            timeout_secs: 1,
            ..GeneratorConfig::default()
        };
        let generator = HttpGenerator::new(config).unwrap();

        let err = generator.generate("hello", 50).unwrap_err();
        assert!(err.is_transient(), "got {err:?}");
        assert!(err.to_string().contains("timed out"), "got {err}");
        server.join().unwrap();
    }

    #[test]
    fn generator_name_follows_provider() {
        let config = GeneratorConfig {
            provider: Provider::OpenAiChat,
            api_key_env: None,
            ..GeneratorConfig::default()
        };
        assert_eq!(HttpGenerator::new(config).unwrap().name(), "openai-chat");
    }
}
