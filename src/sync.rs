// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realtime mirrors of the shared `trips` and `users` collections.
//!
//! Each subscription pushes full snapshots; every snapshot replaces its
//! mirror wholesale, including an empty one. Subscriptions only exist while a
//! session does, and are cancelled explicitly when it ends.

use crate::db::{collections, DocumentStore, SnapshotEvent};
use crate::models::{Identity, Records};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Collections mirrored while signed in.
pub const WATCHED_COLLECTIONS: [&str; 2] = [collections::TRIPS, collections::USERS];

/// A local copy of one collection, with a single writer and many readers.
#[derive(Clone)]
pub struct Mirror {
    tx: Arc<watch::Sender<Arc<Records>>>,
}

impl Default for Mirror {
    fn default() -> Self {
        let (tx, _) = watch::channel(Arc::new(Records::new()));
        Self { tx: Arc::new(tx) }
    }
}

impl Mirror {
    /// Read-only view that is notified on every replacement.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Records>> {
        self.tx.subscribe()
    }

    /// Current contents.
    pub fn current(&self) -> Arc<Records> {
        self.tx.borrow().clone()
    }

    /// Replace the contents unless `cancelled` is set.
    ///
    /// The flag is checked under the channel's write lock, so a replacement
    /// can never land after `clear` for a cancelled subscription.
    fn replace_unless(&self, cancelled: &AtomicBool, records: Records) -> bool {
        self.tx.send_if_modified(move |current| {
            if cancelled.load(Ordering::SeqCst) {
                return false;
            }
            *current = Arc::new(records);
            true
        })
    }

    fn clear(&self) {
        self.tx.send_replace(Arc::new(Records::new()));
    }
}

/// Owned handle to one running collection subscription.
pub struct SubscriptionHandle {
    collection: String,
    cancelled: Arc<AtomicBool>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop listening. Later pushes are discarded.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.task.abort();
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if !self.is_cancelled() {
            self.cancel();
        }
    }
}

/// Keeps the trips and users mirrors in step with the store.
pub struct RealtimeSync {
    store: Arc<dyn DocumentStore>,
    trips: Mirror,
    users: Mirror,
    handles: Vec<SubscriptionHandle>,
    uid: Option<String>,
}

impl RealtimeSync {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            trips: Mirror::default(),
            users: Mirror::default(),
            handles: Vec::new(),
            uid: None,
        }
    }

    pub fn trips(&self) -> &Mirror {
        &self.trips
    }

    pub fn users(&self) -> &Mirror {
        &self.users
    }

    /// Uid the subscriptions were opened for, if running.
    pub fn running_for(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn handles(&self) -> &[SubscriptionHandle] {
        &self.handles
    }

    fn mirror_for(&self, collection: &str) -> &Mirror {
        if collection == collections::TRIPS {
            &self.trips
        } else {
            &self.users
        }
    }

    /// Open subscriptions for a signed-in session. No-op without one.
    ///
    /// A collection whose subscription cannot be opened is logged and left
    /// empty; it is not retried.
    pub async fn start(&mut self, session: Option<&Identity>) {
        let Some(identity) = session else {
            tracing::debug!("No session, not starting sync");
            return;
        };

        if !self.handles.is_empty() {
            self.stop();
        }

        for collection in WATCHED_COLLECTIONS {
            match self.store.subscribe(collection).await {
                Ok(subscription) => {
                    let cancelled = Arc::new(AtomicBool::new(false));
                    let task = tokio::spawn(pump(
                        collection,
                        subscription.events,
                        self.mirror_for(collection).clone(),
                        cancelled.clone(),
                    ));
                    self.handles.push(SubscriptionHandle {
                        collection: collection.to_string(),
                        cancelled,
                        cancel: Some(subscription.cancel),
                        task,
                    });
                }
                Err(e) => {
                    tracing::warn!(collection, uid = %identity.uid, error = %e, "Failed to subscribe");
                }
            }
        }

        self.uid = Some(identity.uid.clone());
        tracing::info!(uid = %identity.uid, subscriptions = self.handles.len(), "Realtime sync started");
    }

    /// Cancel every subscription and empty both mirrors.
    pub fn stop(&mut self) {
        let count = self.handles.len();
        for mut handle in self.handles.drain(..) {
            handle.cancel();
        }
        self.trips.clear();
        self.users.clear();

        if let Some(uid) = self.uid.take() {
            tracing::info!(uid = %uid, cancelled = count, "Realtime sync stopped");
        }
    }
}

/// Apply pushed snapshots to a mirror until the stream ends or is cancelled.
async fn pump(
    collection: &'static str,
    mut events: mpsc::UnboundedReceiver<SnapshotEvent>,
    mirror: Mirror,
    cancelled: Arc<AtomicBool>,
) {
    while let Some(event) = events.recv().await {
        match event {
            Ok(snapshot) => {
                let count = snapshot.len();
                if !mirror.replace_unless(&cancelled, snapshot.into_records()) {
                    break;
                }
                tracing::debug!(collection, count, "Mirror replaced");
            }
            Err(e) => {
                tracing::warn!(collection, error = %e, "Subscription error, keeping last snapshot");
            }
        }
    }
    tracing::debug!(collection, "Subscription closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn records(ids: &[&str]) -> Records {
        ids.iter()
            .map(|id| {
                (
                    id.to_string(),
                    Record {
                        id: id.to_string(),
                        fields: Default::default(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_replace_unless_respects_cancel() {
        let mirror = Mirror::default();
        let cancelled = AtomicBool::new(false);

        assert!(mirror.replace_unless(&cancelled, records(&["a"])));
        assert_eq!(mirror.current().len(), 1);

        cancelled.store(true, Ordering::SeqCst);
        assert!(!mirror.replace_unless(&cancelled, records(&["b", "c"])));
        assert!(mirror.current().contains_key("a"));
    }

    #[test]
    fn test_clear_notifies_readers() {
        let mirror = Mirror::default();
        let cancelled = AtomicBool::new(false);
        mirror.replace_unless(&cancelled, records(&["a"]));

        let mut rx = mirror.subscribe();
        mirror.clear();

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }
}
