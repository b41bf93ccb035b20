// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tripshare host
//!
//! Serves one session of the carpooling front-end: Facebook login, realtime
//! mirrors of trips and users, and the UI state the frontend renders.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tripshare::{
    config::Config,
    db::{DocumentStore, FirestoreStore, MemoryStore},
    services::{FacebookProvider, IdentityProvider},
    session::SessionManager,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Tripshare");

    let store: Arc<dyn DocumentStore> = if config.use_memory_store {
        tracing::warn!("Using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FirestoreStore::new(&config.gcp_project_id).await?)
    };

    let provider = Arc::new(FacebookProvider::new(&config));
    let auth_state = provider.auth_state();

    let session = Arc::new(SessionManager::new(
        provider,
        store,
        config.contact_base_url.clone(),
    ));

    // Auth-state changes drive sync start/stop
    tokio::spawn(session.clone().watch_auth_state(auth_state));

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        session,
    });

    // Build router
    let app = tripshare::routes::create_router(state);

    // Start server
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tripshare=debug,info")),
        )
        .with(format)
        .init();
}
