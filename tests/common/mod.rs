// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tripshare::config::Config;
use tripshare::db::{FirestoreStore, MemoryStore};
use tripshare::models::{AdditionalProfileInfo, AuthResult, Fields, Identity};
use tripshare::routes::create_router;
use tripshare::services::{AuthError, IdentityProvider};
use tripshare::session::SessionManager;
use tripshare::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_firestore() -> FirestoreStore {
    FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[allow(dead_code)]
pub fn test_identity(uid: &str) -> Identity {
    Identity {
        uid: uid.to_string(),
        display_name: Some("Test User".to_string()),
        photo_url: Some(format!("https://example.com/{}.jpg", uid)),
        email: Some(format!("{}@example.com", uid)),
    }
}

#[allow(dead_code)]
pub fn test_info(uid: &str) -> AdditionalProfileInfo {
    AdditionalProfileInfo {
        id: format!("fb-{}", uid),
        name: Some("Test User".to_string()),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
    }
}

#[allow(dead_code)]
pub fn fields(value: serde_json::Value) -> Fields {
    serde_json::from_value(value).expect("fields must be a JSON object")
}

/// Identity provider that signs in whoever it is told to.
pub struct MockProvider {
    next: Mutex<Result<AuthResult, AuthError>>,
    state: watch::Sender<Option<Identity>>,
    sign_ins: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn new(uid: &str) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            next: Mutex::new(Ok(AuthResult {
                identity: test_identity(uid),
                info: test_info(uid),
            })),
            state,
            sign_ins: Mutex::new(Vec::new()),
        }
    }

    /// Make the next sign-ins fail.
    pub fn fail_with(&self, error: AuthError) {
        *self.next.lock().unwrap() = Err(error);
    }

    /// Credentials passed to `sign_in`, oldest first.
    pub fn sign_ins(&self) -> Vec<String> {
        self.sign_ins.lock().unwrap().clone()
    }

    /// Simulate a provider-initiated auth-state change.
    pub fn push_state(&self, identity: Option<Identity>) {
        self.state.send_replace(identity);
    }
}

impl IdentityProvider for MockProvider {
    fn sign_in<'a>(&'a self, credential: &'a str) -> BoxFuture<'a, Result<AuthResult, AuthError>> {
        async move {
            self.sign_ins.lock().unwrap().push(credential.to_string());
            let result = self.next.lock().unwrap().clone();
            if let Ok(auth) = &result {
                self.state.send_replace(Some(auth.identity.clone()));
            }
            result
        }
        .boxed()
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        async move {
            self.state.send_replace(None);
            Ok(())
        }
        .boxed()
    }

    fn auth_state(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }
}

/// Session manager over an in-memory store and a mock provider.
#[allow(dead_code)]
pub fn create_session(uid: &str) -> (Arc<SessionManager>, MemoryStore, Arc<MockProvider>) {
    let store = MemoryStore::new();
    let provider = Arc::new(MockProvider::new(uid));
    let session = Arc::new(SessionManager::new(
        provider.clone(),
        Arc::new(store.clone()),
        "https://m.me/",
    ));
    (session, store, provider)
}

/// Create a test app with in-memory dependencies.
/// Returns the router, the shared state and the store.
#[allow(dead_code)]
pub fn create_test_app(uid: &str) -> (axum::Router, Arc<AppState>, MemoryStore) {
    let (session, store, _) = create_session(uid);
    let state = Arc::new(AppState {
        config: Config::test_default(),
        session,
    });
    (create_router(state.clone()), state, store)
}

/// Wait until a watched value satisfies `pred`, failing the test after a second.
#[allow(dead_code)]
pub async fn wait_for<T>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) {
    tokio::time::timeout(Duration::from_secs(1), rx.wait_for(pred))
        .await
        .expect("timed out waiting for update")
        .expect("sender dropped");
}
