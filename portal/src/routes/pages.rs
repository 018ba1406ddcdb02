use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse},
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    boundary::ErrorBoundary,
    dashboard::AdminDashboard,
    pages::{self, Route, layout},
    wizard::{ApplicationWizard, WizardView},
};

const STYLESHEET: &str = include_str!("../../static/css/portal.css");

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    session: Option<String>,
}

impl PageQuery {
    /// A malformed id is treated like no id at all.
    fn session_id(&self) -> Option<Uuid> {
        self.session.as_deref().and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    }
}

pub fn page_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(Route::Landing.path(), get(landing))
        .route(Route::Client.path(), get(client))
        .route(Route::Admin.path(), get(admin))
        .route("/static/css/portal.css", get(stylesheet))
}

async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

async fn landing() -> Html<String> {
    let page = ErrorBoundary::new(Route::Landing.path()).render(|| Ok(pages::landing::render()));
    Html(layout(&page.into_page()))
}

/// Renders the given wizard session, or a fresh wizard when none is named.
async fn client(State(state): State<Arc<AppState>>, Query(query): Query<PageQuery>) -> Html<String> {
    let session = match query.session_id() {
        Some(id) => state.client_sessions.get(id).await,
        None => None,
    };
    let view = match session {
        Some(session) => session.lock().await.view(),
        None => ApplicationWizard::default().view(),
    };

    client_page(&view)
}

/// The client page for `view`, with render failures caught by the page boundary.
pub fn client_page(view: &WizardView) -> Html<String> {
    let page = ErrorBoundary::new(Route::Client.path()).render(|| pages::client::render(view));
    Html(layout(&page.into_page()))
}

async fn admin(State(state): State<Arc<AppState>>, Query(query): Query<PageQuery>) -> Html<String> {
    let session = match query.session_id() {
        Some(id) => state.admin_sessions.get(id).await,
        None => None,
    };
    let view = match session {
        Some(session) => session.lock().await.view(),
        None => AdminDashboard::default().view(),
    };

    let page = ErrorBoundary::new(Route::Admin.path()).render(|| pages::admin::render(&view));
    Html(layout(&page.into_page()))
}
