//! Chat provider port
//!
//! Defines the interface for asking one conversational-AI backend a
//! question, whatever its transport. Adapters live in the infrastructure
//! layer.

use async_trait::async_trait;
use polyask_domain::Provider;
use thiserror::Error;

/// Errors a provider call can produce
///
/// These never propagate past the dispatch orchestrator: a failing
/// provider degrades to a visible error answer for that provider only.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network-level failure reaching the provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider returned an error-coded response
    #[error("Provider error {code}: {message}")]
    Protocol { code: i64, message: String },

    /// The response body did not have the expected shape
    #[error("Unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// The call exceeded its per-provider deadline
    #[error("Request timed out")]
    Timeout,
}

/// One conversational-AI backend behind a uniform ask contract
///
/// Implementations must be stateless and re-entrant: concurrent `ask`
/// calls on the same instance own their per-call state (accumulators,
/// connections) in the call frame, never on the struct.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Which backend this client reaches
    fn provider(&self) -> Provider;

    /// Send one question and return the provider's complete answer text
    async fn ask(&self, query: &str) -> Result<String, ProviderError>;
}
