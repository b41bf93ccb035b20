// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod identity;
pub mod profile;
pub mod record;
pub mod ui;

pub use identity::{AdditionalProfileInfo, AuthResult, Identity};
pub use profile::Profile;
pub use record::{Document, Fields, Record, Records, Snapshot};
pub use ui::{Tab, UiState};
