// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tripshare: session-gated realtime data core for a carpooling front-end.
//!
//! This crate signs a user in through Facebook, keeps local mirrors of the
//! shared `trips` and `users` collections fresh from Firestore snapshots, and
//! reconciles the user's profile record on every login.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod sync;

use config::Config;
use session::SessionManager;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session: Arc<SessionManager>,
}
