//! SQLite-backed history and account store
//!
//! Single bundled-SQLite connection behind an async mutex; statements run
//! on the blocking pool. Questions and answers cascade on delete, so
//! removing a question removes everything recorded under it.

use async_trait::async_trait;
use polyask_application::{
    AccountError, HistoryAnswer, HistoryEntry, HistoryError, HistoryStore, UserAccounts,
    UserRecord,
};
use polyask_domain::QuestionId;
use rusqlite::{Connection, params};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// SQLite store implementing both the history and the accounts port
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    /// Open or create the database at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| HistoryError::Storage(e.to_string()))?;
            }
        }

        info!("Opening history database at {}", path.display());

        let conn = tokio::task::spawn_blocking(move || -> rusqlite::Result<Connection> {
            let conn = Connection::open(&path)?;
            Self::prepare_connection(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|e| HistoryError::Storage(e.to_string()))?
        .map_err(|e| HistoryError::Storage(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by tests
    pub async fn open_in_memory() -> Result<Self, HistoryError> {
        let conn = tokio::task::spawn_blocking(|| -> rusqlite::Result<Connection> {
            let conn = Connection::open_in_memory()?;
            Self::prepare_connection(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|e| HistoryError::Storage(e.to_string()))?
        .map_err(|e| HistoryError::Storage(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn prepare_connection(conn: &Connection) -> rusqlite::Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users (id)
            );
            CREATE TABLE IF NOT EXISTS answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL,
                provider TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (question_id) REFERENCES questions (id) ON DELETE CASCADE
            );",
        )
    }
}

// Passwords are stored as `salt_hex$sha256_hex`; the salt is fresh per
// password.

fn hash_password(password: &str, salt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn encode_password(password: &str) -> String {
    let salt: [u8; 16] = rand::random();
    format!("{}${}", hex::encode(salt), hash_password(password, &salt))
}

fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    hash_password(password, &salt) == hash
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn create_question(&self, user_id: i64, text: &str) -> Result<QuestionId, HistoryError> {
        let conn = Arc::clone(&self.conn);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || -> rusqlite::Result<QuestionId> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO questions (user_id, content) VALUES (?1, ?2)",
                params![user_id, text],
            )?;
            Ok(QuestionId(conn.last_insert_rowid()))
        })
        .await
        .map_err(|e| HistoryError::Storage(e.to_string()))?
        .map_err(|e| HistoryError::Storage(e.to_string()))
    }

    async fn save_answer(
        &self,
        question_id: QuestionId,
        provider_label: &str,
        content: &str,
    ) -> Result<(), HistoryError> {
        let conn = Arc::clone(&self.conn);
        let provider = provider_label.to_string();
        let content = content.to_string();

        tokio::task::spawn_blocking(move || -> rusqlite::Result<()> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO answers (question_id, provider, content) VALUES (?1, ?2, ?3)",
                params![question_id.0, provider, content],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| HistoryError::Storage(e.to_string()))?
        .map_err(|e| HistoryError::Storage(e.to_string()))
    }

    async fn user_history(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || -> rusqlite::Result<Vec<HistoryEntry>> {
            let conn = conn.blocking_lock();

            let mut question_stmt = conn.prepare(
                "SELECT id, content, timestamp FROM questions
                 WHERE user_id = ?1
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?2",
            )?;
            let questions = question_stmt
                .query_map(params![user_id, limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut answer_stmt = conn.prepare(
                "SELECT provider, content, timestamp FROM answers
                 WHERE question_id = ?1
                 ORDER BY provider",
            )?;

            let mut entries = Vec::with_capacity(questions.len());
            for (id, content, timestamp) in questions {
                let answers = answer_stmt
                    .query_map(params![id], |row| {
                        Ok(HistoryAnswer {
                            provider: row.get(0)?,
                            content: row.get(1)?,
                            timestamp: row.get(2)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                entries.push(HistoryEntry {
                    question_id: QuestionId(id),
                    content,
                    timestamp,
                    answers,
                });
            }

            Ok(entries)
        })
        .await
        .map_err(|e| HistoryError::Storage(e.to_string()))?
        .map_err(|e| HistoryError::Storage(e.to_string()))
    }

    async fn delete_question(
        &self,
        question_id: QuestionId,
        user_id: i64,
    ) -> Result<bool, HistoryError> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || -> rusqlite::Result<bool> {
            let conn = conn.blocking_lock();
            // Ownership check and delete in one statement; answers cascade.
            let deleted = conn.execute(
                "DELETE FROM questions WHERE id = ?1 AND user_id = ?2",
                params![question_id.0, user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
        .map_err(|e| HistoryError::Storage(e.to_string()))?
        .map_err(|e| HistoryError::Storage(e.to_string()))
    }

    async fn clear_history(&self, user_id: i64) -> Result<u64, HistoryError> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || -> rusqlite::Result<u64> {
            let conn = conn.blocking_lock();
            let deleted = conn.execute(
                "DELETE FROM questions WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(deleted as u64)
        })
        .await
        .map_err(|e| HistoryError::Storage(e.to_string()))?
        .map_err(|e| HistoryError::Storage(e.to_string()))
    }
}

#[async_trait]
impl UserAccounts for SqliteHistoryStore {
    async fn register(&self, username: &str, password: &str) -> Result<i64, AccountError> {
        let conn = Arc::clone(&self.conn);
        let username = username.to_string();
        let stored = encode_password(password);

        tokio::task::spawn_blocking(move || -> Result<i64, AccountError> {
            let conn = conn.blocking_lock();
            match conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                params![username, stored],
            ) {
                Ok(_) => Ok(conn.last_insert_rowid()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(AccountError::UsernameTaken)
                }
                Err(e) => Err(AccountError::Storage(e.to_string())),
            }
        })
        .await
        .map_err(|e| AccountError::Storage(e.to_string()))?
    }

    async fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, AccountError> {
        let conn = Arc::clone(&self.conn);
        let username = username.to_string();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || -> rusqlite::Result<Option<UserRecord>> {
            let conn = conn.blocking_lock();
            let mut stmt =
                conn.prepare("SELECT id, username, password FROM users WHERE username = ?1")?;
            let row = stmt
                .query_map(params![username], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .next()
                .transpose()?;

            Ok(row.and_then(|(id, username, stored)| {
                verify_password(&password, &stored).then_some(UserRecord { id, username })
            }))
        })
        .await
        .map_err(|e| AccountError::Storage(e.to_string()))?
        .map_err(|e| AccountError::Storage(e.to_string()))
    }

    async fn username_taken(&self, username: &str) -> Result<bool, AccountError> {
        let conn = Arc::clone(&self.conn);
        let username = username.to_string();

        tokio::task::spawn_blocking(move || -> rusqlite::Result<bool> {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare("SELECT 1 FROM users WHERE username = ?1")?;
            stmt.exists(params![username])
        })
        .await
        .map_err(|e| AccountError::Storage(e.to_string()))?
        .map_err(|e| AccountError::Storage(e.to_string()))
    }

    async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<bool, AccountError> {
        let conn = Arc::clone(&self.conn);
        let old_password = old_password.to_string();
        let stored_new = encode_password(new_password);

        tokio::task::spawn_blocking(move || -> rusqlite::Result<bool> {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare("SELECT password FROM users WHERE id = ?1")?;
            let current = stmt
                .query_map(params![user_id], |row| row.get::<_, String>(0))?
                .next()
                .transpose()?;

            let Some(current) = current else {
                return Ok(false);
            };
            if !verify_password(&old_password, &current) {
                return Ok(false);
            }

            conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                params![stored_new, user_id],
            )?;
            Ok(true)
        })
        .await
        .map_err(|e| AccountError::Storage(e.to_string()))?
        .map_err(|e| AccountError::Storage(e.to_string()))
    }
}
