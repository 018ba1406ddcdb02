use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{ApiError, SessionCreated, bad_gateway, bad_request, conflict, unknown_session};
use crate::{
    AppState,
    api::types::DocumentUpload,
    model::ProfilePatch,
    speech::{Language, RecognitionEvent, VoiceAssistant},
    wizard::{self, ApplicationWizard, EntryMode, WizardError, WizardView},
};

#[derive(Debug, Deserialize)]
struct NewSession {
    speech: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ModeRequest {
    mode: EntryMode,
}

#[derive(Debug, Deserialize)]
struct LanguageRequest {
    language: Language,
}

pub fn client_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/client/sessions", post(create_session))
        .route("/api/client/sessions/{id}", get(get_view).delete(close_session))
        .route("/api/client/sessions/{id}/form", patch(update_form))
        .route("/api/client/sessions/{id}/mode", put(set_mode))
        .route("/api/client/sessions/{id}/next", post(next_step))
        .route("/api/client/sessions/{id}/back", post(previous_step))
        .route("/api/client/sessions/{id}/documents", post(select_documents))
        .route("/api/client/sessions/{id}/voice/events", post(voice_event))
        .route("/api/client/sessions/{id}/voice/toggle", post(voice_toggle))
        .route("/api/client/sessions/{id}/voice/language", put(voice_language))
        .route("/api/client/sessions/{id}/voice/complete", post(voice_complete))
        .route("/api/client/sessions/{id}/voice/apply", post(voice_apply))
        .route("/api/client/sessions/{id}/submit", post(submit))
}

fn wizard_error(err: WizardError) -> ApiError {
    match err {
        WizardError::Upload(_) | WizardError::Submit(_) => bad_gateway(err),
        WizardError::Busy => conflict(err),
        WizardError::Interrupted(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        _ => bad_request(err),
    }
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewSession>,
) -> (StatusCode, Json<SessionCreated<WizardView>>) {
    let wizard = ApplicationWizard::new(query.speech.unwrap_or(true));
    let view = wizard.view();
    let (session_id, _) = state.client_sessions.create(wizard).await;
    info!(%session_id, "client session created");
    (StatusCode::CREATED, Json(SessionCreated { session_id, view }))
}

async fn get_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let view = session.lock().await.view();
    Ok(Json(view))
}

async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.client_sessions.remove(id).await {
        info!(%id, "client session closed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(unknown_session(id))
    }
}

async fn update_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let mut wizard = session.lock().await;
    wizard.update_form(patch).map_err(wizard_error)?;
    Ok(Json(wizard.view()))
}

async fn set_mode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ModeRequest>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let mut wizard = session.lock().await;
    wizard.set_entry_mode(body.mode);
    Ok(Json(wizard.view()))
}

async fn next_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let mut wizard = session.lock().await;
    wizard.next().map_err(wizard_error)?;
    Ok(Json(wizard.view()))
}

async fn previous_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let mut wizard = session.lock().await;
    wizard.back().map_err(wizard_error)?;
    Ok(Json(wizard.view()))
}

/// Multipart file selection; every part counts as one document.
async fn select_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("document-{}", files.len() + 1));
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(bad_request)?;
        files.push(DocumentUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let mut wizard = session.lock().await;
    wizard.select_documents(files).map_err(wizard_error)?;
    Ok(Json(wizard.view()))
}

async fn voice_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(event): Json<RecognitionEvent>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let mut wizard = session.lock().await;
    wizard.voice_mut().handle(event);
    Ok(Json(wizard.view()))
}

async fn voice_toggle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let mut wizard = session.lock().await;
    wizard.voice_mut().toggle();
    Ok(Json(wizard.view()))
}

async fn voice_language(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<LanguageRequest>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let mut wizard = session.lock().await;
    wizard.voice_mut().set_language(body.language);
    Ok(Json(wizard.view()))
}

/// Stops capture and sends the final transcript for field extraction.
async fn voice_complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let (transcript, language) = {
        let mut wizard = session.lock().await;
        let voice = wizard.voice_mut();
        (voice.complete(), voice.language())
    };
    if transcript.is_empty() {
        return Err(bad_request("no speech captured yet"));
    }

    let assistant = VoiceAssistant::new(state.config.fallback.synthetic_data);
    let extraction = assistant
        .extract(state.api.as_ref(), &transcript, language)
        .await
        .map_err(bad_gateway)?;

    let mut wizard = session.lock().await;
    wizard.set_extraction(extraction);
    Ok(Json(wizard.view()))
}

async fn voice_apply(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let mut wizard = session.lock().await;
    if !wizard.apply_pending_extraction().map_err(wizard_error)? {
        return Err(bad_request("no extracted details to apply"));
    }
    Ok(Json(wizard.view()))
}

/// Upload, submit and record history without holding the session across backend calls.
async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let session = state.client_sessions.require(id).await?;
    let view = wizard::submit_shared(session, state.api.clone())
        .await
        .map_err(wizard_error)?;
    info!(%id, "client submission settled");
    Ok(Json(view))
}
