// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Facebook OAuth login and logout routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::services::facebook::authorize_url;
use crate::services::AuthError;
use crate::session::SessionError;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a login dialog may stay open before its state is refused.
const STATE_MAX_AGE_MS: u128 = 15 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/facebook", get(auth_start))
        .route("/auth/facebook/callback", get(auth_callback))
        .route("/auth/logout", post(logout))
}

/// Query parameters for starting OAuth flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend URL to return to after login.
    /// If not provided, uses FRONTEND_URL.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start OAuth flow - redirect to the Facebook login dialog.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
) -> Result<Redirect> {
    if !state.session.can_login() {
        return Err(SessionError::MissingContactHandle.into());
    }

    let frontend_url = params
        .redirect_uri
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let oauth_state = sign_state(&frontend_url, now_ms()?, &state.config.oauth_state_key)?;
    let auth_url = authorize_url(
        &state.config.facebook_app_id,
        &state.config.facebook_redirect_uri,
        &oauth_state,
    );

    tracing::info!(
        frontend_url = %frontend_url,
        "Starting OAuth flow, redirecting to Facebook"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_reason: Option<String>,
}

/// OAuth callback - complete sign-in, reconcile the profile, return to the frontend.
///
/// A callback whose state fails verification never reaches the provider.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let Some(frontend_url) =
        verify_and_decode_state(&params.state, now_ms()?, &state.config.oauth_state_key)
    else {
        tracing::warn!("State parameter failed verification, refusing login");
        return Ok(redirect_with(
            &state.config.frontend_url,
            "error",
            "invalid_state",
        ));
    };

    // User closed or declined the dialog
    if let Some(error) = params.error {
        let denied = AuthError::Denied(params.error_reason.unwrap_or(error));
        tracing::warn!(error = %denied, "OAuth error from Facebook");
        return Ok(redirect_with(&frontend_url, "error", auth_error_code(&denied)));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    match state.session.login(&code).await {
        Ok(outcome) => {
            tracing::info!(
                uid = %outcome.identity.uid,
                profile = ?outcome.profile,
                "Login complete"
            );
            Ok(Redirect::temporary(&frontend_url))
        }
        Err(SessionError::Profile(e)) => {
            tracing::warn!(error = %e, "Signed in without saving profile");
            Ok(redirect_with(&frontend_url, "warning", "profile_not_saved"))
        }
        Err(SessionError::MissingContactHandle) => Ok(redirect_with(
            &frontend_url,
            "error",
            "missing_contact_handle",
        )),
        Err(SessionError::Auth(e)) => {
            tracing::warn!(error = %e, "Sign-in failed");
            Ok(redirect_with(&frontend_url, "error", auth_error_code(&e)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Query value the frontend receives for a failed sign-in.
fn auth_error_code(e: &AuthError) -> &'static str {
    match e {
        AuthError::Denied(_) => "access_denied",
        AuthError::Provider(_) | AuthError::InvalidResponse(_) => "auth_failed",
    }
}

/// Sign out and clear session-scoped state.
async fn logout(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.session.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

fn redirect_with(frontend_url: &str, key: &str, value: &str) -> Redirect {
    let separator = if frontend_url.contains('?') { '&' } else { '?' };
    Redirect::temporary(&format!(
        "{}{}{}={}",
        frontend_url,
        separator,
        key,
        urlencoding::encode(value)
    ))
}

fn now_ms() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Encode the frontend URL and a timestamp into a signed OAuth state.
///
/// Format before base64: "frontend_url|timestamp_hex|signature_hex".
fn sign_state(frontend_url: &str, timestamp_ms: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", frontend_url, timestamp_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify HMAC signature and age, and decode the frontend URL.
fn verify_and_decode_state(state: &str, now_ms: u128, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // The URL itself may contain '|', so split from the right.
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let frontend_url = parts.next()?;

    let payload = format!("{}|{}", frontend_url, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if !bool::from(signature_hex.as_bytes().ct_eq(expected_signature.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_ms = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_ms.saturating_sub(issued_ms) > STATE_MAX_AGE_MS {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(frontend_url.to_string())
}
