//! Fanout value objects - immutable result types for a dispatched question.
//!
//! These types represent the outputs of one dispatch:
//! - [`ProviderAnswer`] - One provider's answer (or visible failure)
//! - [`FanoutResult`] - All answers collected for one question
//! - [`DispatchOutcome`] - Either a full fanout or a single-provider answer

use crate::core::provider::Provider;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a persisted question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub i64);

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Answer from a single provider
///
/// A failed provider still produces an answer: its content carries a
/// human-readable error string so the end user can see which backends
/// responded and which did not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAnswer {
    /// The provider that produced this answer
    pub provider: Provider,
    /// The answer content (or the error text for a failed provider)
    pub content: String,
    /// Whether the provider answered successfully
    pub success: bool,
    /// Error description if the provider failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderAnswer {
    /// Creates a successful answer from a provider.
    pub fn success(provider: Provider, content: impl Into<String>) -> Self {
        Self {
            provider,
            content: content.into(),
            success: true,
            error: None,
        }
    }

    /// Creates a failed answer whose content is the error description.
    pub fn failure(provider: Provider, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            provider,
            content: error.clone(),
            success: false,
            error: Some(error),
        }
    }

    /// Returns `true` if the provider answered successfully.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Stable human-readable label for this answer
    pub fn label(&self) -> &'static str {
        self.provider.display_name()
    }
}

/// All answers collected for one dispatched question
///
/// Each registered provider contributes exactly one answer; provider labels
/// are unique within a result. Assembled once by the orchestrator and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutResult {
    pub question_id: QuestionId,
    pub answers: Vec<ProviderAnswer>,
}

impl FanoutResult {
    /// Assemble a result from collected answers.
    ///
    /// # Panics
    /// Panics in debug builds if two answers share a provider.
    pub fn new(question_id: QuestionId, answers: Vec<ProviderAnswer>) -> Self {
        debug_assert!(
            {
                let mut providers: Vec<_> = answers.iter().map(|a| a.provider).collect();
                providers.sort_by_key(|p| p.as_str());
                providers.windows(2).all(|w| w[0] != w[1])
            },
            "duplicate provider in fanout result"
        );
        Self {
            question_id,
            answers,
        }
    }

    /// Look up the answer produced by a specific provider
    pub fn answer_for(&self, provider: Provider) -> Option<&ProviderAnswer> {
        self.answers.iter().find(|a| a.provider == provider)
    }

    /// Count of providers that answered successfully
    pub fn successful_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_success()).count()
    }
}

/// Outcome of one dispatch: a fanout across all providers, or one answer
/// from the single provider the caller named.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Fanout(FanoutResult),
    Single {
        question_id: QuestionId,
        answer: ProviderAnswer,
    },
}

impl DispatchOutcome {
    /// The persisted question this outcome answers
    pub fn question_id(&self) -> QuestionId {
        match self {
            DispatchOutcome::Fanout(result) => result.question_id,
            DispatchOutcome::Single { question_id, .. } => *question_id,
        }
    }

    /// All answers in this outcome, regardless of shape
    pub fn answers(&self) -> &[ProviderAnswer] {
        match self {
            DispatchOutcome::Fanout(result) => &result.answers,
            DispatchOutcome::Single { answer, .. } => std::slice::from_ref(answer),
        }
    }
}
