//! Spark WebSocket client
//!
//! One `ask` call owns one connection: sign a fresh URL, connect, send a
//! single request frame, then accumulate streamed text until the terminal
//! status. The server never closes the connection; this client does.

use super::protocol::{ChatRequest, ChatResponse, STATUS_FINAL};
use super::signer;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use polyask_application::{ChatProvider, ProviderError};
use polyask_domain::Provider;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Connection and model parameters for the Spark backend
#[derive(Debug, Clone)]
pub struct SparkConfig {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
    pub ws_url: String,
    pub domain: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Stateless Spark client
///
/// Safe to share across concurrent `ask` calls: the answer accumulator
/// and the connection live in the call frame, never on this struct.
pub struct SparkClient {
    config: SparkConfig,
}

impl SparkClient {
    pub fn new(config: SparkConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ChatProvider for SparkClient {
    fn provider(&self) -> Provider {
        Provider::Spark
    }

    async fn ask(&self, query: &str) -> Result<String, ProviderError> {
        // The signature is time-bound, so the URL is built per call.
        let url = signer::signed_ws_url(
            &self.config.ws_url,
            &self.config.api_key,
            &self.config.api_secret,
        )
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let (mut ws, _) = connect_async(&url)
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        debug!("Spark connection open");

        let request = ChatRequest::single_turn(
            &self.config.app_id,
            &self.config.domain,
            self.config.temperature,
            self.config.max_tokens,
            query,
        );
        let frame = serde_json::to_string(&request)
            .map_err(|e| ProviderError::UnexpectedFormat(e.to_string()))?;
        ws.send(Message::Text(frame))
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        // Per-call accumulator: concurrent asks never share state.
        let mut answer = String::new();

        while let Some(message) = ws.next().await {
            let message = message.map_err(|e| ProviderError::Transport(e.to_string()))?;
            match message {
                Message::Text(text) => {
                    let response: ChatResponse = serde_json::from_str(&text)
                        .map_err(|e| ProviderError::UnexpectedFormat(e.to_string()))?;

                    if response.header.code != 0 {
                        let _ = ws.close(None).await;
                        return Err(ProviderError::Protocol {
                            code: response.header.code,
                            message: response.header.message,
                        });
                    }

                    let Some(payload) = response.payload else {
                        continue;
                    };
                    for chunk in &payload.choices.text {
                        answer.push_str(&chunk.content);
                    }
                    if payload.choices.status == STATUS_FINAL {
                        let _ = ws.close(None).await;
                        return Ok(answer);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        // Stream ended before the terminal status: hand back whatever
        // arrived rather than failing the whole answer.
        warn!("Spark stream closed before terminal status, returning partial answer");
        Ok(answer)
    }
}
