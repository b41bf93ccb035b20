// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session gate for routes that expose session-scoped data.

use crate::models::Identity;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Identity of the active session, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct SessionUser(pub Identity);

/// Middleware that rejects requests while nobody is signed in.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let identity = state
        .session
        .current_session()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(SessionUser(identity));
    Ok(next.run(request).await)
}
