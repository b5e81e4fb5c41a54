use crate::session::{self, SessionStore};
use advisor_core::domain::profile::UserProfile;
use advisor_core::pipeline::{BatchReply, BatchRequest, ChatReply, ChatRequest, Pipeline};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    /// `None` when startup could not build the pipeline; chat routes answer 503.
    pub pipeline: Option<Arc<Pipeline>>,
    pub sessions: Arc<SessionStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/chat", post(chat))
        .route("/batch", post(batch))
        .route("/profile", get(get_profile).put(put_profile))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<(HeaderMap, Json<ChatReply>), StatusCode> {
    let Some(pipeline) = &state.pipeline else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let session_id = session::session_id(&headers);
    let profile = state.sessions.get_or_init(&session_id).await;
    let reply = pipeline.answer(req, profile).await;
    tracing::info!(
        %session_id,
        profile = profile.label_ko(),
        symbol = reply.data.symbol.as_deref().unwrap_or("-"),
        degradations = ?reply.degradations,
        "chat answered"
    );

    Ok((session::session_headers(&session_id), Json(reply)))
}

async fn batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BatchRequest>,
) -> Result<(HeaderMap, Json<BatchReply>), StatusCode> {
    let Some(pipeline) = &state.pipeline else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let session_id = session::session_id(&headers);
    let profile = state.sessions.get_or_init(&session_id).await;
    let companies = req.companies.len();
    let reply = pipeline.summarize_batch(req, profile).await;
    tracing::info!(%session_id, companies, degradations = ?reply.degradations, "batch answered");

    Ok((session::session_headers(&session_id), Json(reply)))
}

#[derive(Debug, Serialize)]
struct ProfileView {
    session_id: String,
    profile: UserProfile,
}

#[derive(Debug, Deserialize)]
struct ProfileUpdate {
    profile: String,
}

async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (HeaderMap, Json<ProfileView>) {
    let session_id = session::session_id(&headers);
    let profile = state.sessions.get_or_init(&session_id).await;
    (
        session::session_headers(&session_id),
        Json(ProfileView {
            session_id,
            profile,
        }),
    )
}

async fn put_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Result<(HeaderMap, Json<ProfileView>), StatusCode> {
    let profile = update.profile.parse::<UserProfile>().map_err(|e| {
        tracing::debug!(error = %e, "rejected profile update");
        StatusCode::BAD_REQUEST
    })?;

    let session_id = session::session_id(&headers);
    state.sessions.set(&session_id, profile).await;
    tracing::info!(%session_id, profile = profile.label_ko(), "profile updated");

    Ok((
        session::session_headers(&session_id),
        Json(ProfileView {
            session_id,
            profile,
        }),
    ))
}
