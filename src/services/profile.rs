// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile reconciliation on login.
//!
//! A profile is created once per uid. Afterwards only the contact URL may
//! change; every other field keeps the value written at creation.

use crate::db::{collections, DocumentStore, StoreError};
use crate::models::profile::CONTACT_URL_FIELD;
use crate::models::record::to_fields;
use crate::models::{AdditionalProfileInfo, Fields, Identity, Profile};
use std::sync::Arc;

/// What an upsert did to the stored profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    ContactUpdated,
    Unchanged,
}

/// Profile upsert errors.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to encode profile: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Creates or corrects the signed-in user's profile.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    contact_base_url: String,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>, contact_base_url: impl Into<String>) -> Self {
        Self {
            store,
            contact_base_url: contact_base_url.into(),
        }
    }

    /// Contact URL for a handle.
    pub fn contact_url(&self, handle: &str) -> String {
        format!("{}{}", self.contact_base_url, handle)
    }

    /// Reconcile the stored profile for `identity` with this login.
    pub async fn upsert(
        &self,
        identity: &Identity,
        info: &AdditionalProfileInfo,
        contact_handle: &str,
    ) -> Result<UpsertOutcome, ProfileError> {
        let uid = identity.uid.as_str();
        let contact_url = self.contact_url(contact_handle);

        let result = self.reconcile(identity, info, contact_url).await;
        match &result {
            Ok(outcome) => tracing::info!(uid, outcome = ?outcome, "Profile upsert complete"),
            Err(e) => tracing::error!(uid, error = %e, "Profile upsert failed"),
        }
        result
    }

    async fn reconcile(
        &self,
        identity: &Identity,
        info: &AdditionalProfileInfo,
        contact_url: String,
    ) -> Result<UpsertOutcome, ProfileError> {
        let uid = identity.uid.as_str();

        let existing = match self.store.read(collections::USERS, uid).await? {
            Some(existing) => existing,
            None => {
                let profile = Profile::new(identity, info, contact_url.clone());
                match self
                    .store
                    .create(collections::USERS, uid, &to_fields(&profile)?)
                    .await
                {
                    Ok(()) => return Ok(UpsertOutcome::Created),
                    Err(StoreError::AlreadyExists { .. }) => {
                        // Another login created it between our read and write.
                        tracing::warn!(uid, "Profile created concurrently, reconciling");
                        self.store
                            .read(collections::USERS, uid)
                            .await?
                            .ok_or_else(|| StoreError::NotFound {
                                collection: collections::USERS.to_string(),
                                id: uid.to_string(),
                            })?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let stored = existing
            .get(CONTACT_URL_FIELD)
            .and_then(|value| value.as_str());
        if stored == Some(contact_url.as_str()) {
            tracing::debug!(uid, "Profile contact URL unchanged");
            return Ok(UpsertOutcome::Unchanged);
        }

        let mut patch = Fields::new();
        patch.insert(CONTACT_URL_FIELD.to_string(), contact_url.into());
        self.store.update(collections::USERS, uid, &patch).await?;

        Ok(UpsertOutcome::ContactUpdated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_contact_url_joins_base_and_handle() {
        let service = ProfileService::new(Arc::new(MemoryStore::new()), "https://m.me/");
        assert_eq!(service.contact_url("jane.doe"), "https://m.me/jane.doe");
    }
}
