// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod facebook;
pub mod identity;
pub mod profile;

pub use facebook::FacebookProvider;
pub use identity::{AuthError, IdentityProvider};
pub use profile::{ProfileError, ProfileService, UpsertOutcome};
