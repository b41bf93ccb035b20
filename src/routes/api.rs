// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Presentation API: session, mirrors and UI state.

use crate::error::{AppError, Result};
use crate::middleware::auth::SessionUser;
use crate::models::{Identity, Record, Tab};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Public routes: anyone may read the session and drive the login dialog.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/ui", get(get_ui))
        .route("/api/ui/tab", put(put_tab))
        .route("/api/ui/contact-handle", put(put_contact_handle))
        .route("/api/ui/login-modal/toggle", post(toggle_login_modal))
        .route("/api/ui/login-help/toggle", post(toggle_login_help))
}

/// Routes that expose mirrored collections (require a session).
/// The session gate is applied in routes/mod.rs.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/trips", get(get_trips))
        .route("/api/users", get(get_users))
}

// ─── Session & Mirrors ──────────────────────────────────────

/// Current identity, or `null` when signed out.
async fn get_session(State(state): State<Arc<AppState>>) -> Json<Option<Identity>> {
    Json(state.session.current_session())
}

/// Trips by document ID.
async fn get_trips(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Json<HashMap<String, Record>> {
    let trips = state.session.current_trips();
    tracing::debug!(uid = %user.0.uid, count = trips.len(), "Serving trips");
    Json(trips.as_ref().clone())
}

/// Users by document ID.
async fn get_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Json<HashMap<String, Record>> {
    let users = state.session.current_users();
    tracing::debug!(uid = %user.0.uid, count = users.len(), "Serving users");
    Json(users.as_ref().clone())
}

// ─── UI State ───────────────────────────────────────────────

/// UI state as the frontend renders it.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UiResponse {
    pub active_tab: Tab,
    pub contact_handle: String,
    /// Link for testing the handle; absent until one is entered
    pub contact_url: Option<String>,
    pub can_login: bool,
    pub show_login_modal: bool,
    pub login_help_open: bool,
    pub signed_in: bool,
}

fn ui_response(state: &AppState) -> UiResponse {
    let session = &state.session;
    let ui = session.ui();
    UiResponse {
        active_tab: ui.active_tab,
        contact_handle: ui.contact_handle,
        contact_url: session.contact_url_preview(),
        can_login: session.can_login(),
        show_login_modal: session.show_login_modal(),
        login_help_open: ui.login_help_open,
        signed_in: session.current_session().is_some(),
    }
}

async fn get_ui(State(state): State<Arc<AppState>>) -> Json<UiResponse> {
    Json(ui_response(&state))
}

#[derive(Debug, Deserialize)]
pub struct TabRequest {
    pub tab: Tab,
}

async fn put_tab(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TabRequest>,
) -> Result<Json<UiResponse>> {
    state.session.select_tab(body.tab)?;
    Ok(Json(ui_response(&state)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactHandleRequest {
    /// Messenger username, without the base URL
    #[validate(length(max = 50))]
    pub handle: String,
}

async fn put_contact_handle(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ContactHandleRequest>,
) -> Result<Json<UiResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let handle = body.handle.trim();
    if handle.contains(['/', '?', '#']) || handle.chars().any(char::is_whitespace) {
        return Err(AppError::BadRequest(
            "Contact handle must be a bare username".to_string(),
        ));
    }

    state.session.set_contact_handle(handle);
    Ok(Json(ui_response(&state)))
}

async fn toggle_login_modal(State(state): State<Arc<AppState>>) -> Json<UiResponse> {
    state.session.toggle_login_modal();
    Json(ui_response(&state))
}

async fn toggle_login_help(State(state): State<Arc<AppState>>) -> Json<UiResponse> {
    state.session.toggle_login_help();
    Json(ui_response(&state))
}
