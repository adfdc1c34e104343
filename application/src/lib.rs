//! Application layer for polyask
//!
//! This crate contains use cases, port definitions, and dispatch policy.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::DispatchPolicy;
pub use ports::{
    chat_provider::{ChatProvider, ProviderError},
    history_store::{HistoryAnswer, HistoryEntry, HistoryError, HistoryStore},
    user_accounts::{AccountError, UserAccounts, UserRecord},
};
pub use use_cases::dispatch_query::{
    DispatchError, DispatchInput, DispatchQueryUseCase,
};
