use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ApiError, SessionCreated, bad_request, unknown_session};
use crate::{
    AppState,
    dashboard::{self, AdminDashboard, DashboardContext, DashboardError, DashboardView},
    panels::{counterfactual::DeltaField, temporal::Metric},
    scene::{RecordingAdapter, SceneEvent, ScenePatch},
};

#[derive(Debug, Deserialize)]
struct ClientRef {
    client_id: String,
}

#[derive(Debug, Deserialize)]
struct MetricRequest {
    metric: Metric,
}

#[derive(Debug, Deserialize)]
struct DeltaRequest {
    field: DeltaField,
    value: f64,
}

#[derive(Debug, Serialize)]
struct SceneUpdate {
    galaxy: Vec<ScenePatch>,
    network: Vec<ScenePatch>,
    view: DashboardView,
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/sessions", post(create_session))
        .route("/api/admin/sessions/{id}", get(get_view).delete(close_session))
        .route("/api/admin/sessions/{id}/application", put(select_application))
        .route("/api/admin/sessions/{id}/search", post(search))
        .route("/api/admin/sessions/{id}/similar", put(select_similar))
        .route("/api/admin/sessions/{id}/scene/sync", post(sync_scenes))
        .route("/api/admin/sessions/{id}/scene/events", post(scene_event))
        .route("/api/admin/sessions/{id}/metric", put(set_metric))
        .route(
            "/api/admin/sessions/{id}/counterfactual",
            post(run_counterfactual)
                .put(set_delta)
                .delete(reset_counterfactual),
        )
        .route("/api/admin/sessions/{id}/fraud", post(fraud_check))
        .route("/api/admin/focus", post(window_focus))
}

fn context(state: &AppState) -> DashboardContext<'_> {
    DashboardContext {
        api: state.api.as_ref(),
        cache: state.cache.as_ref(),
        top_k: state.config.api.top_k,
        applications_limit: state.config.api.applications_limit,
        synthetic_fallback: state.config.fallback.synthetic_data,
    }
}

fn dashboard_error(err: DashboardError) -> ApiError {
    match err {
        DashboardError::UnknownApplication(_) | DashboardError::UnknownSimilarClient(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        _ => bad_request(err),
    }
}

async fn view_of(session: &Mutex<AdminDashboard>) -> Json<DashboardView> {
    Json(session.lock().await.view())
}

/// New dashboard with the application list and collection stats loaded.
async fn create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SessionCreated<DashboardView>>) {
    let (session_id, session) = state.admin_sessions.create(AdminDashboard::default()).await;
    let ctx = context(&state);
    let (applications, stats) = tokio::join!(
        dashboard::load_applications(ctx, &session),
        dashboard::load_stats(ctx, &session),
    );
    info!(%session_id, applications, stats, "admin session created");
    let view = session.lock().await.view();
    (StatusCode::CREATED, Json(SessionCreated { session_id, view }))
}

async fn get_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardView>, ApiError> {
    let session = state.admin_sessions.require(id).await?;
    Ok(view_of(&session).await)
}

async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.admin_sessions.remove(id).await {
        info!(%id, "admin session closed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(unknown_session(id))
    }
}

async fn select_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ClientRef>,
) -> Result<Json<DashboardView>, ApiError> {
    let session = state.admin_sessions.require(id).await?;
    let mut dash = session.lock().await;
    dash.select_application(&body.client_id).map_err(dashboard_error)?;
    Ok(Json(dash.view()))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardView>, ApiError> {
    let session = state.admin_sessions.require(id).await?;
    let landed = dashboard::run_search(context(&state), &session)
        .await
        .map_err(dashboard_error)?;
    debug!(%id, landed, "similarity search finished");
    Ok(view_of(&session).await)
}

async fn select_similar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ClientRef>,
) -> Result<Json<DashboardView>, ApiError> {
    let session = state.admin_sessions.require(id).await?;
    dashboard::select_similar(context(&state), &session, &body.client_id)
        .await
        .map_err(dashboard_error)?;
    Ok(view_of(&session).await)
}

async fn scene_update(session: &Mutex<AdminDashboard>) -> SceneUpdate {
    let mut dash = session.lock().await;
    let mut galaxy = RecordingAdapter::default();
    let mut network = RecordingAdapter::default();
    dash.sync_galaxy(&mut galaxy);
    dash.sync_network(&mut network);
    SceneUpdate {
        galaxy: galaxy.take_patches(),
        network: network.take_patches(),
        view: dash.view(),
    }
}

/// Patches that bring the browser's scenes up to date with the session.
async fn sync_scenes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SceneUpdate>, ApiError> {
    let session = state.admin_sessions.require(id).await?;
    Ok(Json(scene_update(&session).await))
}

async fn scene_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(event): Json<SceneEvent>,
) -> Result<Json<SceneUpdate>, ApiError> {
    let session = state.admin_sessions.require(id).await?;
    let selected = session.lock().await.handle_scene_event(event);
    if let Some(client_id) = selected {
        dashboard::select_similar(context(&state), &session, &client_id)
            .await
            .map_err(dashboard_error)?;
    }
    Ok(Json(scene_update(&session).await))
}

async fn set_metric(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<MetricRequest>,
) -> Result<Json<DashboardView>, ApiError> {
    let session = state.admin_sessions.require(id).await?;
    let mut dash = session.lock().await;
    dash.set_metric(body.metric);
    Ok(Json(dash.view()))
}

async fn set_delta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<DeltaRequest>,
) -> Result<Json<DashboardView>, ApiError> {
    if !body.value.is_finite() {
        return Err(bad_request("slider value must be a finite number"));
    }
    let session = state.admin_sessions.require(id).await?;
    let mut dash = session.lock().await;
    dash.set_counterfactual_delta(body.field, body.value);
    Ok(Json(dash.view()))
}

async fn run_counterfactual(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardView>, ApiError> {
    let session = state.admin_sessions.require(id).await?;
    if session.lock().await.counterfactual().base().is_none() {
        return Err(bad_request(DashboardError::NoApplicationSelected));
    }
    dashboard::run_counterfactual(context(&state), &session).await;
    Ok(view_of(&session).await)
}

async fn reset_counterfactual(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardView>, ApiError> {
    let session = state.admin_sessions.require(id).await?;
    let mut dash = session.lock().await;
    dash.reset_counterfactual();
    Ok(Json(dash.view()))
}

async fn fraud_check(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardView>, ApiError> {
    let session = state.admin_sessions.require(id).await?;
    dashboard::run_fraud_check(context(&state), &session)
        .await
        .map_err(dashboard_error)?;
    Ok(view_of(&session).await)
}

/// Window regained focus: stale cached queries are dropped when configured to refetch.
async fn window_focus(State(state): State<Arc<AppState>>) -> StatusCode {
    state.cache.on_focus().await;
    StatusCode::NO_CONTENT
}
