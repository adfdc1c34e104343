//! API routes
//!
//! Thin JSON handlers over the dispatch use case and the store ports.
//! Every response carries a `success` flag; failures add a `message`.

use crate::server::AppState;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use polyask_application::{AccountError, DispatchError, DispatchInput, HistoryEntry};
use polyask_domain::{DispatchOutcome, DomainError, ProviderAnswer, ProviderSelector, Question, QuestionId};
use serde::{Deserialize, Serialize};
use tracing::error;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            success: false,
            message: message.into(),
        }),
    )
}

// ============================================================================
// Chat
// ============================================================================

pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/api/chat", post(chat))
}

#[derive(Deserialize)]
struct ChatRequest {
    query: String,
    user_id: i64,
    #[serde(default)]
    model: Option<String>,
}

/// One answer as returned to the frontend: the wire key plus the stable
/// human-readable label
#[derive(Serialize)]
struct AnswerBody {
    provider: String,
    label: &'static str,
    content: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ProviderAnswer> for AnswerBody {
    fn from(answer: ProviderAnswer) -> Self {
        Self {
            provider: answer.provider.to_string(),
            label: answer.label(),
            content: answer.content,
            success: answer.success,
            error: answer.error,
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum ChatResponse {
    Fanout {
        success: bool,
        question_id: QuestionId,
        answers: Vec<AnswerBody>,
    },
    Single {
        success: bool,
        question_id: QuestionId,
        provider: &'static str,
        answer: String,
    },
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Some(question) = Question::try_new(request.query) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Question cannot be empty"));
    };

    let selector = match request.model.as_deref() {
        None => ProviderSelector::All,
        Some(value) => value
            .parse()
            .map_err(|e: DomainError| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
    };

    let outcome = state
        .dispatch
        .execute(DispatchInput {
            user_id: request.user_id,
            question,
            selector,
        })
        .await
        .map_err(dispatch_error)?;

    Ok(Json(match outcome {
        DispatchOutcome::Fanout(result) => ChatResponse::Fanout {
            success: true,
            question_id: result.question_id,
            answers: result.answers.into_iter().map(Into::into).collect(),
        },
        DispatchOutcome::Single {
            question_id,
            answer,
        } => ChatResponse::Single {
            success: true,
            question_id,
            provider: answer.label(),
            answer: answer.content,
        },
    }))
}

fn dispatch_error(e: DispatchError) -> ApiError {
    match e {
        DispatchError::ProviderUnavailable(_) | DispatchError::NoProviders => {
            api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        DispatchError::History(_) | DispatchError::Cancelled => {
            error!("Dispatch failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ============================================================================
// History
// ============================================================================

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/api/history", get(get_history))
        .route("/api/history/delete", post(delete_history))
        .route("/api/history/clear", post(clear_history))
}

fn default_limit() -> u32 {
    20
}

#[derive(Deserialize)]
struct HistoryParams {
    user_id: i64,
    #[serde(default = "default_limit")]
    limit: u32,
}

#[derive(Serialize)]
struct HistoryResponse {
    success: bool,
    history: Vec<HistoryEntry>,
}

async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state
        .history
        .user_history(params.user_id, params.limit)
        .await
        .map_err(|e| {
            error!("Failed to load history: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(HistoryResponse {
        success: true,
        history,
    }))
}

#[derive(Deserialize)]
struct DeleteHistoryRequest {
    question_id: i64,
    user_id: i64,
}

#[derive(Serialize)]
struct OkBody {
    success: bool,
    message: String,
}

async fn delete_history(
    State(state): State<AppState>,
    Json(request): Json<DeleteHistoryRequest>,
) -> Result<Json<OkBody>, ApiError> {
    let deleted = state
        .history
        .delete_question(QuestionId(request.question_id), request.user_id)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if deleted {
        Ok(Json(OkBody {
            success: true,
            message: "History entry deleted".to_string(),
        }))
    } else {
        Err(api_error(
            StatusCode::NOT_FOUND,
            "Question not found or not owned by this user",
        ))
    }
}

#[derive(Deserialize)]
struct ClearHistoryRequest {
    user_id: i64,
}

#[derive(Serialize)]
struct ClearHistoryResponse {
    success: bool,
    cleared: u64,
}

async fn clear_history(
    State(state): State<AppState>,
    Json(request): Json<ClearHistoryRequest>,
) -> Result<Json<ClearHistoryResponse>, ApiError> {
    let cleared = state
        .history
        .clear_history(request.user_id)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ClearHistoryResponse {
        success: true,
        cleared,
    }))
}

// ============================================================================
// Accounts
// ============================================================================

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/change-password", post(change_password))
}

#[derive(Deserialize)]
struct CredentialsRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct RegisterResponse {
    success: bool,
    user_id: i64,
    message: String,
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Username and password must not be empty",
        ));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters",
        ));
    }

    match state
        .accounts
        .register(&request.username, &request.password)
        .await
    {
        Ok(user_id) => Ok(Json(RegisterResponse {
            success: true,
            user_id,
            message: "Registration successful".to_string(),
        })),
        Err(AccountError::UsernameTaken) => Err(api_error(
            StatusCode::BAD_REQUEST,
            "Username already exists",
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    user_id: i64,
    username: String,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .accounts
        .verify(&request.username, &request.password)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match user {
        Some(user) => Ok(Json(LoginResponse {
            success: true,
            user_id: user.id,
            username: user.username,
        })),
        None => Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Invalid username or password",
        )),
    }
}

#[derive(Deserialize)]
struct ChangePasswordRequest {
    user_id: i64,
    old_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<OkBody>, ApiError> {
    if request.new_password.len() < MIN_PASSWORD_LEN {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "New password must be at least 6 characters",
        ));
    }

    let changed = state
        .accounts
        .change_password(request.user_id, &request.old_password, &request.new_password)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if changed {
        Ok(Json(OkBody {
            success: true,
            message: "Password changed".to_string(),
        }))
    } else {
        Err(api_error(
            StatusCode::BAD_REQUEST,
            "Old password is incorrect",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{AppState, router};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use polyask_application::{
        ChatProvider, DispatchPolicy, DispatchQueryUseCase, HistoryError, HistoryStore,
        ProviderError, UserAccounts, UserRecord,
    };
    use polyask_domain::Provider;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    // ==================== Test Mocks ====================

    struct MockProvider {
        provider: Provider,
        reply: Result<String, String>,
    }

    #[async_trait]
    impl ChatProvider for MockProvider {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn ask(&self, _query: &str) -> Result<String, ProviderError> {
            match &self.reply {
                Ok(content) => Ok(content.clone()),
                Err(e) => Err(ProviderError::Transport(e.clone())),
            }
        }
    }

    #[derive(Default)]
    struct MockStore {
        users: Mutex<HashMap<String, (i64, String)>>,
        next_question: Mutex<i64>,
        answers: Mutex<Vec<(i64, String, String)>>,
    }

    #[async_trait]
    impl HistoryStore for MockStore {
        async fn create_question(
            &self,
            _user_id: i64,
            _text: &str,
        ) -> Result<QuestionId, HistoryError> {
            let mut next = self.next_question.lock().unwrap();
            *next += 1;
            Ok(QuestionId(*next))
        }

        async fn save_answer(
            &self,
            question_id: QuestionId,
            provider_label: &str,
            content: &str,
        ) -> Result<(), HistoryError> {
            self.answers.lock().unwrap().push((
                question_id.0,
                provider_label.to_string(),
                content.to_string(),
            ));
            Ok(())
        }

        async fn user_history(
            &self,
            _user_id: i64,
            _limit: u32,
        ) -> Result<Vec<HistoryEntry>, HistoryError> {
            Ok(Vec::new())
        }

        async fn delete_question(
            &self,
            question_id: QuestionId,
            _user_id: i64,
        ) -> Result<bool, HistoryError> {
            Ok(question_id.0 == 1)
        }

        async fn clear_history(&self, _user_id: i64) -> Result<u64, HistoryError> {
            Ok(2)
        }
    }

    #[async_trait]
    impl UserAccounts for MockStore {
        async fn register(&self, username: &str, password: &str) -> Result<i64, AccountError> {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(username) {
                return Err(AccountError::UsernameTaken);
            }
            let id = users.len() as i64 + 1;
            users.insert(username.to_string(), (id, password.to_string()));
            Ok(id)
        }

        async fn verify(
            &self,
            username: &str,
            password: &str,
        ) -> Result<Option<UserRecord>, AccountError> {
            Ok(self.users.lock().unwrap().get(username).and_then(
                |(id, stored)| {
                    (stored == password).then(|| UserRecord {
                        id: *id,
                        username: username.to_string(),
                    })
                },
            ))
        }

        async fn username_taken(&self, username: &str) -> Result<bool, AccountError> {
            Ok(self.users.lock().unwrap().contains_key(username))
        }

        async fn change_password(
            &self,
            _user_id: i64,
            _old_password: &str,
            _new_password: &str,
        ) -> Result<bool, AccountError> {
            Ok(false)
        }
    }

    fn test_app() -> axum::Router {
        let store = Arc::new(MockStore::default());
        let providers: Vec<Arc<dyn ChatProvider>> = vec![
            Arc::new(MockProvider {
                provider: Provider::Spark,
                reply: Ok("spark answer".to_string()),
            }),
            Arc::new(MockProvider {
                provider: Provider::Qianfan,
                reply: Err("connection refused".to_string()),
            }),
        ];
        let dispatch =
            DispatchQueryUseCase::new(providers, store.clone(), DispatchPolicy::default());

        router(AppState {
            dispatch: Arc::new(dispatch),
            history: store.clone(),
            accounts: store,
        })
    }

    async fn post_json(app: axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn chat_fanout_returns_labeled_answers_including_failures() {
        let (status, json) = post_json(
            test_app(),
            "/api/chat",
            serde_json::json!({"query": "hello?", "user_id": 1}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        let answers = json["answers"].as_array().unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0]["label"], "Spark");
        assert_eq!(answers[0]["content"], "spark answer");
        assert_eq!(answers[1]["label"], "Qianfan");
        assert_eq!(answers[1]["success"], false);
    }

    #[tokio::test]
    async fn chat_single_provider_returns_one_answer() {
        let (status, json) = post_json(
            test_app(),
            "/api/chat",
            serde_json::json!({"query": "hello?", "user_id": 1, "model": "spark"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["provider"], "Spark");
        assert_eq!(json["answer"], "spark answer");
        assert!(json.get("answers").is_none());
    }

    #[tokio::test]
    async fn chat_unknown_model_is_rejected_without_side_effects() {
        let store = Arc::new(MockStore::default());
        let providers: Vec<Arc<dyn ChatProvider>> = vec![Arc::new(MockProvider {
            provider: Provider::Spark,
            reply: Ok("unused".to_string()),
        })];
        let dispatch =
            DispatchQueryUseCase::new(providers, store.clone(), DispatchPolicy::default());
        let app = router(AppState {
            dispatch: Arc::new(dispatch),
            history: store.clone(),
            accounts: store.clone(),
        });

        let (status, json) = post_json(
            app,
            "/api/chat",
            serde_json::json!({"query": "hello?", "user_id": 1, "model": "gpt-4"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .contains("unsupported model type")
        );
        // Nothing was dispatched or persisted
        assert_eq!(*store.next_question.lock().unwrap(), 0);
        assert!(store.answers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn chat_empty_query_is_rejected() {
        let (status, _) = post_json(
            test_app(),
            "/api/chat",
            serde_json::json!({"query": "   ", "user_id": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_login_roundtrip() {
        let app = test_app();

        let (status, json) = post_json(
            app.clone(),
            "/api/register",
            serde_json::json!({"username": "alice", "password": "secret1"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let (status, json) = post_json(
            app.clone(),
            "/api/login",
            serde_json::json!({"username": "alice", "password": "secret1"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["username"], "alice");

        let (status, _) = post_json(
            app,
            "/api/login",
            serde_json::json!({"username": "alice", "password": "wrong"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let (status, json) = post_json(
            test_app(),
            "/api/register",
            serde_json::json!({"username": "alice", "password": "short"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("6 characters"));
    }

    #[tokio::test]
    async fn delete_missing_question_is_not_found() {
        let (status, _) = post_json(
            test_app(),
            "/api/history/delete",
            serde_json::json!({"question_id": 99, "user_id": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
