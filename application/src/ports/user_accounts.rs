//! User accounts port
//!
//! Authentication collaborator for the HTTP boundary. Kept behind a port
//! so the server never sees how credentials are stored.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the account backend
#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Username already exists")]
    UsernameTaken,

    #[error("Storage error: {0}")]
    Storage(String),
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
}

/// Registration, login and password management
#[async_trait]
pub trait UserAccounts: Send + Sync {
    /// Create a new account, returning the user id
    async fn register(&self, username: &str, password: &str) -> Result<i64, AccountError>;

    /// Verify credentials; `None` when the username/password pair is wrong
    async fn verify(&self, username: &str, password: &str)
    -> Result<Option<UserRecord>, AccountError>;

    /// Whether a username is already registered
    async fn username_taken(&self, username: &str) -> Result<bool, AccountError>;

    /// Change a password after verifying the old one; false when the old
    /// password does not match
    async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<bool, AccountError>;
}
