//! Bearer-token HTTP provider client
//!
//! Qianfan and Doubao both speak the OpenAI-compatible chat-completions
//! shape: one POST with a bearer token, one JSON response with a
//! `choices` array. A single client type covers both; the instances
//! differ only in identity, credentials, endpoint and model id.

use async_trait::async_trait;
use polyask_application::{ChatProvider, ProviderError};
use polyask_domain::Provider;
use serde::{Deserialize, Serialize};

/// Fixed system instruction sent as the first turn of every request
const SYSTEM_INSTRUCTION: &str = "You are an AI assistant.";

/// How much of an upstream body to quote back in error strings
const BODY_SNIPPET_LEN: usize = 200;

/// Endpoint and model parameters for one bearer-token backend
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
}

/// Stateless chat-completions client for one provider identity
pub struct OpenAiCompatClient {
    provider: Provider,
    config: OpenAiCompatConfig,
    http: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(provider: Provider, config: OpenAiCompatConfig, http: reqwest::Client) -> Self {
        Self {
            provider,
            config,
            http,
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

fn snippet(body: &str) -> String {
    if body.len() <= BODY_SNIPPET_LEN {
        body.to_string()
    } else {
        let mut end = BODY_SNIPPET_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn ask(&self, query: &str) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
        };

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::Protocol {
                code: i64::from(status.as_u16()),
                message: snippet(&body),
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|_| ProviderError::UnexpectedFormat(snippet(&body)))?;

        let first = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::UnexpectedFormat("response has no choices".to_string()))?;

        Ok(first.message.content)
    }
}
