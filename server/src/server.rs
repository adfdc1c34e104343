//! HTTP server assembly

use crate::routes;
use anyhow::Result;
use axum::Router;
use polyask_application::{DispatchQueryUseCase, HistoryStore, UserAccounts};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatch: Arc<DispatchQueryUseCase>,
    pub history: Arc<dyn HistoryStore>,
    pub accounts: Arc<dyn UserAccounts>,
}

/// Build the full API router for the given state
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::chat_routes())
        .merge(routes::history_routes())
        .merge(routes::account_routes())
        .with_state(state)
        // The browser frontend is served from a different origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(state: AppState, bind: &str) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
