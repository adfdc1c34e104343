//! History store port
//!
//! Persists question/answer pairs under a user account. The dispatch use
//! case records every answer through this port before returning.

use async_trait::async_trait;
use polyask_domain::QuestionId;
use serde::Serialize;
use thiserror::Error;

/// Errors from the persistence backend
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Question {0} not found")]
    QuestionNotFound(QuestionId),
}

/// One persisted answer, as returned in history listings
#[derive(Debug, Clone, Serialize)]
pub struct HistoryAnswer {
    pub provider: String,
    pub content: String,
    pub timestamp: String,
}

/// One persisted question with all of its answers
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub question_id: QuestionId,
    pub content: String,
    pub timestamp: String,
    pub answers: Vec<HistoryAnswer>,
}

/// Persistence for questions and the answers each provider gave
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Record a new question, returning its identifier
    async fn create_question(&self, user_id: i64, text: &str) -> Result<QuestionId, HistoryError>;

    /// Record one provider's answer to a previously created question
    async fn save_answer(
        &self,
        question_id: QuestionId,
        provider_label: &str,
        content: &str,
    ) -> Result<(), HistoryError>;

    /// Most recent questions for a user, newest first, each with answers
    async fn user_history(&self, user_id: i64, limit: u32)
    -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Delete one question and its answers; false when the question does
    /// not exist or belongs to another user
    async fn delete_question(
        &self,
        question_id: QuestionId,
        user_id: i64,
    ) -> Result<bool, HistoryError>;

    /// Delete all of a user's questions and answers, returning the number
    /// of questions removed
    async fn clear_history(&self, user_id: i64) -> Result<u64, HistoryError>;
}
