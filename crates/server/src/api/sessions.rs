//! Session API handlers.
//!
//! Each browser tab opens a session and sends its id in the `x-session-id`
//! header. The session owns the search cache and the provider call budget.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use gondola_core::{CallRecord, QuotaStatus};

use super::error::{api_error, ApiError};
use crate::sessions::SharedSession;
use crate::state::AppState;

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "x-session-id";

// ============================================================================
// Extractor
// ============================================================================

/// The session named by the `x-session-id` header.
///
/// Rejects with 400 when the header is missing or malformed and 404 when no
/// such session is open.
pub struct CurrentSession {
    pub id: Uuid,
    pub session: SharedSession,
}

impl FromRequestParts<Arc<AppState>> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                api_error(
                    StatusCode::BAD_REQUEST,
                    format!("Missing {} header", SESSION_HEADER),
                )
            })?;

        let id = Uuid::parse_str(raw).map_err(|_| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("Invalid session id: {}", raw),
            )
        })?;

        let session = state.sessions().get(id).await.ok_or_else(|| {
            api_error(StatusCode::NOT_FOUND, format!("Session not found: {}", id))
        })?;

        Ok(Self { id, session })
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub quota: QuotaStatus,
    /// Provider calls in the current window, oldest first.
    pub history: Vec<CallRecord>,
    pub cached_searches: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheClearedResponse {
    pub cleared: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SessionCreatedResponse>) {
    let session_id = state.sessions().create(state.resolver()).await;
    (
        StatusCode::CREATED,
        Json(SessionCreatedResponse { session_id }),
    )
}

/// DELETE /api/v1/sessions
///
/// Tear down the session named by the header.
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> StatusCode {
    state.sessions().remove(current.id).await;
    StatusCode::NO_CONTENT
}

/// GET /api/v1/session/quota
pub async fn get_quota(current: CurrentSession) -> Json<QuotaResponse> {
    let mut session = current.session.lock().await;
    let quota = session.quota_mut().status();

    Json(QuotaResponse {
        session_id: current.id,
        created_at: session.created_at(),
        quota,
        history: session.quota().history().to_vec(),
        cached_searches: session.cache().len(),
    })
}

/// DELETE /api/v1/session/cache
///
/// Forget cached searches so the next search goes to the provider.
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> Json<CacheClearedResponse> {
    let mut session = current.session.lock().await;
    let cleared = session.cache().len();
    state.resolver().reset(&mut session);
    Json(CacheClearedResponse { cleared })
}
