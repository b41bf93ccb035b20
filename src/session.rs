// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session manager: owns the signed-in identity and session-scoped UI state.
//!
//! Auth-state changes are the only trigger for starting or stopping the
//! realtime mirrors. A login additionally reconciles the user's profile.

use crate::db::DocumentStore;
use crate::models::{Identity, Records, Tab, UiState};
use crate::services::{AuthError, IdentityProvider, ProfileError, ProfileService, UpsertOutcome};
use crate::sync::{Mirror, RealtimeSync};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Session errors. None of them end the process.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("A contact handle is required before signing in")]
    MissingContactHandle,

    #[error("Sign in to open the {0} tab")]
    TabRequiresSession(Tab),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The session is established, but the profile write failed.
    #[error("Signed in, but the profile could not be saved: {0}")]
    Profile(#[from] ProfileError),
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub profile: UpsertOutcome,
}

/// Single writer for the session, the mirrors and the UI state.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    profiles: ProfileService,
    sync: Mutex<RealtimeSync>,
    trips: Mirror,
    users: Mirror,
    session: watch::Sender<Option<Identity>>,
    ui: watch::Sender<UiState>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        contact_base_url: impl Into<String>,
    ) -> Self {
        let sync = RealtimeSync::new(store.clone());
        let trips = sync.trips().clone();
        let users = sync.users().clone();
        let (session, _) = watch::channel(None);
        let (ui, _) = watch::channel(UiState::default());

        Self {
            provider,
            profiles: ProfileService::new(store, contact_base_url),
            sync: Mutex::new(sync),
            trips,
            users,
            session,
            ui,
        }
    }

    // ─── Presentation Boundary ───────────────────────────────────

    pub fn session(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }

    pub fn current_session(&self) -> Option<Identity> {
        self.session.borrow().clone()
    }

    pub fn trips(&self) -> watch::Receiver<Arc<Records>> {
        self.trips.subscribe()
    }

    pub fn users(&self) -> watch::Receiver<Arc<Records>> {
        self.users.subscribe()
    }

    pub fn current_trips(&self) -> Arc<Records> {
        self.trips.current()
    }

    pub fn current_users(&self) -> Arc<Records> {
        self.users.current()
    }

    pub fn ui(&self) -> UiState {
        self.ui.borrow().clone()
    }

    pub fn ui_updates(&self) -> watch::Receiver<UiState> {
        self.ui.subscribe()
    }

    /// Whether the login dialog should be shown.
    pub fn show_login_modal(&self) -> bool {
        self.session.borrow().is_none() && self.ui.borrow().show_login_modal
    }

    /// Login needs a contact handle first.
    pub fn can_login(&self) -> bool {
        !self.ui.borrow().contact_handle.is_empty()
    }

    /// Link the user can open to test their handle.
    pub fn contact_url_preview(&self) -> Option<String> {
        let ui = self.ui.borrow();
        if ui.contact_handle.is_empty() {
            None
        } else {
            Some(self.profiles.contact_url(&ui.contact_handle))
        }
    }

    /// Number of collection subscriptions currently held.
    pub async fn active_subscriptions(&self) -> usize {
        self.sync.lock().await.handles().len()
    }

    // ─── UI State ────────────────────────────────────────────────

    pub fn select_tab(&self, tab: Tab) -> Result<(), SessionError> {
        if tab.requires_session() && self.session.borrow().is_none() {
            return Err(SessionError::TabRequiresSession(tab));
        }
        self.ui.send_if_modified(|ui| {
            let changed = ui.active_tab != tab;
            ui.active_tab = tab;
            changed
        });
        Ok(())
    }

    pub fn set_contact_handle(&self, handle: &str) {
        let handle = handle.trim();
        self.ui.send_if_modified(|ui| {
            if ui.contact_handle == handle {
                return false;
            }
            ui.contact_handle = handle.to_string();
            true
        });
    }

    /// Returns the new visibility flag.
    pub fn toggle_login_modal(&self) -> bool {
        let mut shown = false;
        self.ui.send_modify(|ui| {
            ui.show_login_modal = !ui.show_login_modal;
            shown = ui.show_login_modal;
        });
        shown
    }

    /// Returns whether the help panel is now open.
    pub fn toggle_login_help(&self) -> bool {
        let mut open = false;
        self.ui.send_modify(|ui| {
            ui.login_help_open = !ui.login_help_open;
            open = ui.login_help_open;
        });
        open
    }

    // ─── Auth State ──────────────────────────────────────────────

    /// Apply an auth-state notification.
    ///
    /// A repeated notification for the uid already being synced only
    /// refreshes the stored identity.
    pub async fn on_auth_changed(&self, identity: Option<Identity>) {
        let mut sync = self.sync.lock().await;

        match identity {
            Some(identity) => {
                if sync.running_for() == Some(identity.uid.as_str()) {
                    self.session.send_replace(Some(identity));
                    return;
                }

                tracing::info!(uid = %identity.uid, "Signed in");
                sync.stop();
                self.session.send_replace(Some(identity.clone()));
                sync.start(Some(&identity)).await;
            }
            None => {
                sync.stop();
                if self.session.send_replace(None).is_some() {
                    tracing::info!("Signed out");
                }
                self.ui.send_modify(UiState::reset_for_logout);
            }
        }
    }

    /// Feed provider auth-state changes into `on_auth_changed` until the
    /// provider goes away. A session the provider already holds is applied
    /// first.
    pub async fn watch_auth_state(self: Arc<Self>, mut auth_state: watch::Receiver<Option<Identity>>) {
        let initial = auth_state.borrow_and_update().clone();
        if initial.is_some() {
            self.on_auth_changed(initial).await;
        }
        while auth_state.changed().await.is_ok() {
            let identity = auth_state.borrow_and_update().clone();
            self.on_auth_changed(identity).await;
        }
        tracing::debug!("Auth state stream closed");
    }

    /// Sign in with a credential from the provider's login dialog.
    ///
    /// Auth failures leave the session untouched. A profile failure is
    /// returned as `SessionError::Profile` with the session already active.
    pub async fn login(&self, credential: &str) -> Result<LoginOutcome, SessionError> {
        let contact_handle = self.ui.borrow().contact_handle.clone();
        if contact_handle.is_empty() {
            return Err(SessionError::MissingContactHandle);
        }

        let auth = self.provider.sign_in(credential).await.map_err(|e| {
            tracing::warn!(error = %e, "Sign-in failed");
            e
        })?;

        self.on_auth_changed(Some(auth.identity.clone())).await;

        let profile = self
            .profiles
            .upsert(&auth.identity, &auth.info, &contact_handle)
            .await?;

        Ok(LoginOutcome {
            identity: auth.identity,
            profile,
        })
    }

    /// Sign out with the provider, then drop all session-scoped state.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.provider.sign_out().await?;
        self.on_auth_changed(None).await;
        Ok(())
    }
}
