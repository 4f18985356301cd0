use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use buildboard_core::{
    DashboardStatus, EnrichedBuild, FilterField, FilterOverrides, FilterSpec, filter,
};
use tracing::info;

use crate::{
    state::{AgentState, RefreshOutcome},
    types::{ErrorResponse, FilterUpdate, RefreshResponse},
    workers::RefreshTrigger,
};

/// Error reply rendered as `{ "error": ... }`.
struct ErrorReply(StatusCode, String);

impl IntoResponse for ErrorReply {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorResponse { error: self.1 })).into_response()
    }
}

pub fn router(state: AgentState) -> Router {
    Router::new()
        .route("/builds", get(list_builds))
        .route("/builds/all", get(all_builds))
        .route("/builds/:slug", get(get_build))
        .route("/app-titles", get(app_titles))
        .route("/status", get(status))
        .route("/refresh", post(refresh))
        .route(
            "/filter",
            get(get_filter).put(update_filter).delete(reset_filter),
        )
        .with_state(state)
}

pub async fn start_api(state: AgentState, port: u16) -> Result<()> {
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(port, "buildboardd listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// Visible builds. Query parameters override the stored filter for this
// request only.
async fn list_builds(
    State(state): State<AgentState>,
    Query(overrides): Query<FilterOverrides>,
) -> Json<Vec<EnrichedBuild>> {
    let snapshot = state.snapshot().await;
    if overrides.is_empty() {
        return Json(snapshot.visible().to_vec());
    }
    let spec = overrides.apply_to(snapshot.filter());
    Json(filter::apply(snapshot.builds(), &spec))
}

async fn all_builds(State(state): State<AgentState>) -> Json<Vec<EnrichedBuild>> {
    Json(state.snapshot().await.builds().to_vec())
}

async fn get_build(
    State(state): State<AgentState>,
    Path(slug): Path<String>,
) -> Result<Json<EnrichedBuild>, ErrorReply> {
    state
        .snapshot()
        .await
        .find(&slug)
        .cloned()
        .map(Json)
        .ok_or_else(|| ErrorReply(StatusCode::NOT_FOUND, format!("Build not found: {slug}")))
}

async fn app_titles(State(state): State<AgentState>) -> Json<Vec<String>> {
    Json(filter::distinct_app_titles(state.snapshot().await.builds()))
}

async fn status(State(state): State<AgentState>) -> Json<DashboardStatus> {
    Json(state.snapshot().await.status())
}

async fn refresh(
    State(state): State<AgentState>,
) -> Result<(StatusCode, Json<RefreshResponse>), ErrorReply> {
    match state.trigger_refresh(RefreshTrigger::Manual).await {
        RefreshOutcome::Accepted => Ok((
            StatusCode::ACCEPTED,
            Json(RefreshResponse { status: "accepted" }),
        )),
        RefreshOutcome::AlreadyRunning => Err(ErrorReply(
            StatusCode::CONFLICT,
            "A fetch is already in progress".to_string(),
        )),
        RefreshOutcome::WorkerStopped => Err(ErrorReply(
            StatusCode::SERVICE_UNAVAILABLE,
            "Refresh worker is not running".to_string(),
        )),
    }
}

async fn get_filter(State(state): State<AgentState>) -> Json<FilterSpec> {
    Json(state.snapshot().await.filter().clone())
}

async fn update_filter(
    State(state): State<AgentState>,
    Json(update): Json<FilterUpdate>,
) -> Result<Json<FilterSpec>, ErrorReply> {
    let field: FilterField = update
        .field
        .parse()
        .map_err(|e: buildboard_core::error::UnknownFilterField| {
            ErrorReply(StatusCode::BAD_REQUEST, e.to_string())
        })?;

    Ok(Json(state.update_filter(field, update.value).await))
}

async fn reset_filter(State(state): State<AgentState>) -> Json<FilterSpec> {
    Json(state.replace_filter(FilterSpec::default()).await)
}
