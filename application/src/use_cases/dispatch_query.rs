//! Dispatch Query use case
//!
//! Orchestrates the fanout of one question to the selected providers,
//! collects their answers with per-provider failure isolation, and
//! persists everything through the history store.

use crate::config::DispatchPolicy;
use crate::ports::chat_provider::ChatProvider;
use crate::ports::history_store::{HistoryError, HistoryStore};
use polyask_domain::{
    DispatchOutcome, FanoutResult, Provider, ProviderAnswer, ProviderSelector, Question,
    QuestionId,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that can abort a dispatch as a whole
///
/// Individual provider failures never appear here: they degrade to error
/// answers inside the outcome.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Provider not configured: {0}")]
    ProviderUnavailable(Provider),

    #[error("No providers configured")]
    NoProviders,

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Dispatch cancelled")]
    Cancelled,
}

/// Input for the DispatchQuery use case
#[derive(Debug, Clone)]
pub struct DispatchInput {
    /// Account the question is recorded under
    pub user_id: i64,
    /// The question to ask
    pub question: Question,
    /// Which providers answer it
    pub selector: ProviderSelector,
}

impl DispatchInput {
    pub fn new(user_id: i64, question: impl Into<Question>, selector: ProviderSelector) -> Self {
        Self {
            user_id,
            question: question.into(),
            selector,
        }
    }
}

/// Use case for dispatching one question to the selected providers
pub struct DispatchQueryUseCase {
    providers: Vec<Arc<dyn ChatProvider>>,
    history: Arc<dyn HistoryStore>,
    policy: DispatchPolicy,
}

impl DispatchQueryUseCase {
    pub fn new(
        providers: Vec<Arc<dyn ChatProvider>>,
        history: Arc<dyn HistoryStore>,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            providers,
            history,
            policy,
        }
    }

    /// Execute the use case without external cancellation
    pub async fn execute(&self, input: DispatchInput) -> Result<DispatchOutcome, DispatchError> {
        self.execute_cancellable(input, &CancellationToken::new())
            .await
    }

    /// Execute the use case, aborting in-flight provider calls when the
    /// token fires. Dropped calls close their connections on drop.
    pub async fn execute_cancellable(
        &self,
        input: DispatchInput,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        if self.providers.is_empty() {
            return Err(DispatchError::NoProviders);
        }

        // The question is recorded before any provider is contacted, so
        // every answer has an id to attach to.
        let question_id = self
            .history
            .create_question(input.user_id, input.question.content())
            .await?;

        match input.selector {
            ProviderSelector::All => {
                let result = self.fan_out(question_id, &input, cancel).await?;
                Ok(DispatchOutcome::Fanout(result))
            }
            ProviderSelector::One(provider) => {
                let answer = self.ask_single(question_id, provider, &input, cancel).await?;
                Ok(DispatchOutcome::Single {
                    question_id,
                    answer,
                })
            }
        }
    }

    /// Query every registered provider in parallel
    async fn fan_out(
        &self,
        question_id: QuestionId,
        input: &DispatchInput,
        cancel: &CancellationToken,
    ) -> Result<FanoutResult, DispatchError> {
        info!(
            %question_id,
            providers = self.providers.len(),
            "Dispatching question to all providers"
        );

        let prompt = format!(
            "{}{}",
            input.question.content(),
            self.policy.reply_brief_suffix
        );

        let mut join_set = JoinSet::new();

        for client in &self.providers {
            let client = Arc::clone(client);
            let prompt = prompt.clone();
            let deadline = self.policy.provider_timeout;

            join_set.spawn(async move {
                let provider = client.provider();
                let result = timeout(deadline, client.ask(&prompt)).await;
                (provider, result)
            });
        }

        let mut answers = Vec::with_capacity(self.providers.len());

        loop {
            let joined = tokio::select! {
                _ = cancel.cancelled() => {
                    join_set.abort_all();
                    return Err(DispatchError::Cancelled);
                }
                joined = join_set.join_next() => joined,
            };

            let Some(joined) = joined else { break };

            match joined {
                Ok((provider, result)) => answers.push(self.to_answer(provider, result)),
                Err(e) => warn!("Provider task join error: {}", e),
            }
        }

        // JoinSet yields in completion order; restore the stable registry
        // order so labels never depend on which backend was fastest.
        answers.sort_by_key(|a| {
            self.providers
                .iter()
                .position(|p| p.provider() == a.provider)
        });

        self.persist_answers(question_id, &answers).await;

        Ok(FanoutResult::new(question_id, answers))
    }

    /// Query exactly one provider, without the brevity suffix
    async fn ask_single(
        &self,
        question_id: QuestionId,
        provider: Provider,
        input: &DispatchInput,
        cancel: &CancellationToken,
    ) -> Result<ProviderAnswer, DispatchError> {
        let client = self
            .providers
            .iter()
            .find(|p| p.provider() == provider)
            .ok_or(DispatchError::ProviderUnavailable(provider))?;

        info!(%question_id, %provider, "Dispatching question to single provider");

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
            result = timeout(self.policy.provider_timeout, client.ask(input.question.content())) => result,
        };

        let answer = self.to_answer(provider, result);
        self.persist_answers(question_id, std::slice::from_ref(&answer))
            .await;

        Ok(answer)
    }

    /// Convert one provider call outcome into an answer, containing any
    /// failure as a visible error string for that provider only.
    fn to_answer(
        &self,
        provider: Provider,
        result: Result<Result<String, crate::ports::chat_provider::ProviderError>, tokio::time::error::Elapsed>,
    ) -> ProviderAnswer {
        match result {
            Ok(Ok(content)) => {
                debug!(%provider, "Provider answered");
                ProviderAnswer::success(provider, content)
            }
            Ok(Err(e)) => {
                warn!(%provider, "Provider failed: {}", e);
                ProviderAnswer::failure(provider, format!("{} request failed: {}", provider.display_name(), e))
            }
            Err(_) => {
                warn!(%provider, "Provider timed out");
                ProviderAnswer::failure(
                    provider,
                    format!(
                        "{} did not answer within {}s",
                        provider.display_name(),
                        self.policy.provider_timeout.as_secs()
                    ),
                )
            }
        }
    }

    /// Record every answer. A save failure is logged and does not roll
    /// back or block the response.
    async fn persist_answers(&self, question_id: QuestionId, answers: &[ProviderAnswer]) {
        for answer in answers {
            if let Err(e) = self
                .history
                .save_answer(question_id, answer.label(), &answer.content)
                .await
            {
                warn!(
                    %question_id,
                    provider = answer.label(),
                    "Failed to persist answer: {}",
                    e
                );
            }
        }
    }
}
