//! Identity provider boundary.

use crate::models::{AuthResult, Identity};
use futures_util::future::BoxFuture;
use tokio::sync::watch;

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The user closed or declined the provider's consent dialog.
    #[error("Sign-in denied: {0}")]
    Denied(String),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Unexpected identity provider response: {0}")]
    InvalidResponse(String),
}

/// Operations the core needs from an identity provider.
pub trait IdentityProvider: Send + Sync {
    /// Complete an interactive sign-in using the credential the user brought back.
    fn sign_in<'a>(&'a self, credential: &'a str) -> BoxFuture<'a, Result<AuthResult, AuthError>>;

    /// End the provider-side session.
    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>>;

    /// Stream of auth-state changes: the signed-in identity, or `None`.
    fn auth_state(&self) -> watch::Receiver<Option<Identity>>;
}
