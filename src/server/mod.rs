// HTTP server
// Serves the chat page and answers questions posted to /ask


use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::query::QueryEngine;
use crate::{FaqError, Result};

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Clone)]
struct AppState {
    engine: Arc<QueryEngine>,
}

/// Build the application router around a shared query engine
#[inline]
pub fn router(engine: Arc<QueryEngine>) -> Router {
    Router::new()
        .route("/", get(index_html))
        .route("/ask", post(ask))
        .with_state(AppState { engine })
}

async fn index_html() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn ask(State(state): State<AppState>, Json(request): Json<AskRequest>) -> Json<AskResponse> {
    let engine = &state.engine;

    if request.question.trim().is_empty() {
        return Json(AskResponse {
            answer: engine.no_answer_message().to_string(),
        });
    }

    debug!("Question received: {}", request.question);
    let answer = match engine.answer_question(&request.question).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("Error processing question: {}", e);
            engine.no_answer_message().to_string()
        }
    };

    Json(AskResponse { answer })
}

/// Open the index, then serve HTTP until interrupted
#[inline]
pub async fn serve(config: &Config) -> Result<()> {
    let engine = Arc::new(QueryEngine::from_config(config).await?);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(address.as_str())
        .await
        .map_err(|e| FaqError::Server(format!("Failed to bind {}: {}", address, e)))?;
    let addr: SocketAddr = listener.local_addr()?;

    info!("Serving FAQ chatbot on http://{}/", addr);
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| FaqError::Server(format!("Server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
