//! HTTP routes.
//!
//! | Method | Path                        | Operation        |
//! |--------|-----------------------------|------------------|
//! | GET    | `/`                         | service banner   |
//! | POST   | `/sessions/start`           | start            |
//! | POST   | `/sessions/:id/events`      | append           |
//! | POST   | `/sessions/:id/finalize`    | finalize         |
//! | GET    | `/sessions/:id/verify`      | verify           |
//! | GET    | `/sessions/:id`             | session status   |
//! | GET    | `/public-key`               | verifying key    |

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use provenance::store::Store;
use provenance::{FormatVersion, Kernel, SessionId};

use crate::error::ApiError;

/// Shared state for Axum handlers.
pub struct AppState<S: Store> {
    pub kernel: Arc<Kernel<S>>,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            kernel: Arc::clone(&self.kernel),
        }
    }
}

/// Build the application router.
pub fn router<S: Store + 'static>(kernel: Arc<Kernel<S>>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/sessions/start", post(start_session::<S>))
        .route("/sessions/:id", get(session_status::<S>))
        .route("/sessions/:id/events", post(record_events::<S>))
        .route("/sessions/:id/finalize", post(finalize_session::<S>))
        .route("/sessions/:id/verify", get(verify_session::<S>))
        .route("/public-key", get(public_key::<S>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(AppState { kernel })
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / response bodies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventCreate {
    pub character: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordEventsResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeSessionResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub session_id: SessionId,
    pub finalized: bool,
    pub event_count: u64,
    pub format: Option<FormatVersion>,
    pub data_hash: Option<String>,
    pub signature: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub algorithm: String,
    pub public_key: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        name: "Provenance".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "ok".to_string(),
    })
}

async fn start_session<S: Store + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let session_id = state.kernel.start().await?;
    Ok(Json(StartSessionResponse { session_id }))
}

async fn record_events<S: Store + 'static>(
    State(state): State<AppState<S>>,
    id: Result<Path<SessionId>, PathRejection>,
    body: Result<Json<Vec<EventCreate>>, JsonRejection>,
) -> Result<Json<RecordEventsResponse>, ApiError> {
    let id = session_id(id)?;
    let Json(events) = body.map_err(|rejection| ApiError::BadRequest {
        status: rejection.status(),
        detail: rejection.body_text(),
    })?;

    let characters: Vec<&str> = events.iter().map(|e| e.character.as_str()).collect();
    state.kernel.append_text(id, &characters).await?;

    Ok(Json(RecordEventsResponse {
        status: "events recorded".to_string(),
    }))
}

async fn finalize_session<S: Store + 'static>(
    State(state): State<AppState<S>>,
    id: Result<Path<SessionId>, PathRejection>,
) -> Result<Json<FinalizeSessionResponse>, ApiError> {
    let id = session_id(id)?;
    state.kernel.finalize(id).await?;
    Ok(Json(FinalizeSessionResponse { success: true }))
}

async fn verify_session<S: Store + 'static>(
    State(state): State<AppState<S>>,
    id: Result<Path<SessionId>, PathRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let id = session_id(id)?;
    let outcome = state.kernel.verify(id).await?;
    Ok(Json(VerifyResponse {
        verified: outcome.is_verified(),
        message: outcome.message(),
    }))
}

async fn session_status<S: Store + 'static>(
    State(state): State<AppState<S>>,
    id: Result<Path<SessionId>, PathRejection>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let id = session_id(id)?;
    let status = state.kernel.session(id).await?;
    Ok(Json(SessionStatusResponse {
        session_id: status.id,
        finalized: status.is_finalized(),
        event_count: status.event_count,
        format: status.format,
        data_hash: status.data_hash,
        signature: status.signature,
        started_at: status.started_at,
        finalized_at: status.finalized_at,
    }))
}

async fn public_key<S: Store + 'static>(State(state): State<AppState<S>>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        algorithm: state.kernel.config().format.signature_scheme().to_string(),
        public_key: state.kernel.public_key().to_hex(),
    })
}

fn session_id(path: Result<Path<SessionId>, PathRejection>) -> Result<SessionId, ApiError> {
    path.map(|Path(id)| id).map_err(|rejection| ApiError::BadRequest {
        status: rejection.status(),
        detail: rejection.body_text(),
    })
}
