// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed document store.
//!
//! Provides:
//! - Point reads, create-only inserts and field-masked updates
//! - Collection listeners that fold Firestore's per-document changes into
//!   full snapshots, published whenever the listen target is consistent

use super::{DocumentStore, SnapshotEvent, StoreError, Subscription};
use crate::models::{Document, Fields, Snapshot};
use firestore::errors::FirestoreError;
use firestore::{
    FirestoreListenEvent, FirestoreListenerTarget, FirestoreMemListenStateStorage,
    FirestoreWritePrecondition,
};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use gcloud_sdk::google::firestore::v1::target_change::TargetChangeType;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Firestore document store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
    next_target_id: Arc<AtomicU32>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self::with_client(Some(client)))
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self::with_client(Some(client)))
    }

    /// Create a disconnected store for testing (offline mode).
    ///
    /// All operations return an error.
    pub fn new_mock() -> Self {
        Self::with_client(None)
    }

    fn with_client(client: Option<firestore::FirestoreDb>) -> Self {
        Self {
            client,
            next_target_id: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Backend("Database not connected (offline mode)".to_string()))
    }

    async fn open_listener(&self, collection: &str) -> Result<Subscription, StoreError> {
        let client = self.get_client()?;
        let target_id = self.next_target_id.fetch_add(1, Ordering::Relaxed);

        let mut listener = client
            .create_listener(FirestoreMemListenStateStorage::new())
            .await
            .map_err(map_firestore_error)?;

        client
            .fluent()
            .select()
            .from(collection)
            .listen()
            .add_target(FirestoreListenerTarget::new(target_id), &mut listener)
            .map_err(map_firestore_error)?;

        let (subscription, events, cancel) = Subscription::channel();
        let folder = Arc::new(SnapshotFolder {
            collection: collection.to_string(),
            documents: Mutex::new(BTreeMap::new()),
            events,
        });

        listener
            .start(move |event| {
                let folder = folder.clone();
                async move {
                    folder.apply(event);
                    Ok(())
                }
            })
            .await
            .map_err(map_firestore_error)?;

        let listener_collection = collection.to_string();
        tokio::spawn(async move {
            // Resolves on explicit cancel or when the subscription is dropped.
            let _ = cancel.await;
            if let Err(e) = listener.shutdown().await {
                tracing::warn!(collection = %listener_collection, error = %e, "Failed to stop Firestore listener");
            } else {
                tracing::debug!(collection = %listener_collection, "Firestore listener stopped");
            }
        });

        tracing::info!(collection, target_id, "Firestore listener started");
        Ok(subscription)
    }
}

/// Folds per-document listen events into full collection snapshots.
struct SnapshotFolder {
    collection: String,
    documents: Mutex<BTreeMap<String, Fields>>,
    events: mpsc::UnboundedSender<SnapshotEvent>,
}

impl SnapshotFolder {
    fn apply(&self, event: FirestoreListenEvent) {
        let mut documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            FirestoreListenEvent::DocumentChange(change) => {
                let Some(doc) = change.document else {
                    return;
                };
                let id = document_id(&doc.name);
                match firestore::FirestoreDb::deserialize_doc_to::<Fields>(&doc) {
                    Ok(fields) => {
                        documents.insert(id, fields);
                    }
                    Err(e) => {
                        tracing::warn!(
                            collection = %self.collection,
                            doc_id = %id,
                            error = %e,
                            "Skipping undecodable document"
                        );
                    }
                }
            }
            FirestoreListenEvent::DocumentDelete(delete) => {
                documents.remove(&document_id(&delete.document));
            }
            FirestoreListenEvent::DocumentRemove(remove) => {
                documents.remove(&document_id(&remove.document));
            }
            FirestoreListenEvent::TargetChange(target) => {
                if let Some(cause) = target.cause {
                    let _ = self
                        .events
                        .send(Err(StoreError::Backend(format!(
                            "Listen target failed: {}",
                            cause.message
                        ))));
                    return;
                }

                let kind = target.target_change_type;
                let consistent = kind == TargetChangeType::Current as i32
                    || (kind == TargetChangeType::NoChange as i32
                        && target.target_ids.is_empty()
                        && target.read_time.is_some());
                if kind == TargetChangeType::Reset as i32 {
                    documents.clear();
                }
                if consistent {
                    let snapshot = Snapshot {
                        documents: documents
                            .iter()
                            .map(|(id, fields)| Document {
                                id: id.clone(),
                                fields: fields.clone(),
                            })
                            .collect(),
                    };
                    let _ = self.events.send(Ok(snapshot));
                }
            }
            _ => {}
        }
    }
}

/// Last path segment of a full document name.
fn document_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

fn map_firestore_error(e: FirestoreError) -> StoreError {
    match e {
        FirestoreError::DataConflictError(e) => StoreError::AlreadyExists {
            collection: String::new(),
            id: e.to_string(),
        },
        FirestoreError::DataNotFoundError(e) => StoreError::NotFound {
            collection: String::new(),
            id: e.to_string(),
        },
        FirestoreError::DeserializeError(e) => StoreError::InvalidData(e.to_string()),
        FirestoreError::SerializeError(e) => StoreError::InvalidData(e.to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}

/// Attach the document coordinates when the backend error lacks them.
fn with_coordinates(e: StoreError, collection: &str, id: &str) -> StoreError {
    match e {
        StoreError::AlreadyExists { .. } => StoreError::AlreadyExists {
            collection: collection.to_string(),
            id: id.to_string(),
        },
        StoreError::NotFound { .. } => StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        },
        other => other,
    }
}

impl DocumentStore for FirestoreStore {
    fn subscribe<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<Subscription, StoreError>> {
        self.open_listener(collection).boxed()
    }

    fn read<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Fields>, StoreError>> {
        async move {
            self.get_client()?
                .fluent()
                .select()
                .by_id_in(collection)
                .obj::<Fields>()
                .one(id)
                .await
                .map_err(map_firestore_error)
        }
        .boxed()
    }

    fn create<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: &'a Fields,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            // Firestore insert is create-only and fails if the document exists.
            let _: () = self
                .get_client()?
                .fluent()
                .insert()
                .into(collection)
                .document_id(id)
                .object(fields)
                .execute()
                .await
                .map_err(|e| with_coordinates(map_firestore_error(e), collection, id))?;
            Ok(())
        }
        .boxed()
    }

    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: &'a Fields,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .fields(fields.keys())
                .in_col(collection)
                .precondition(FirestoreWritePrecondition::Exists(true))
                .document_id(id)
                .object(fields)
                .execute()
                .await
                .map_err(|e| with_coordinates(map_firestore_error(e), collection, id))?;
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_from_full_name() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/trips/abc123"),
            "abc123"
        );
        assert_eq!(document_id("plain"), "plain");
    }

    #[tokio::test]
    async fn test_offline_store_errors() {
        let store = FirestoreStore::new_mock();
        let err = store.read("users", "u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(store.subscribe("trips").await.is_err());
    }

    #[test]
    fn test_with_coordinates_fills_conflict() {
        let err = with_coordinates(
            StoreError::AlreadyExists {
                collection: String::new(),
                id: "detail".to_string(),
            },
            "users",
            "u1",
        );
        assert_eq!(
            err,
            StoreError::AlreadyExists {
                collection: "users".to_string(),
                id: "u1".to_string()
            }
        );
    }
}
