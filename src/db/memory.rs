// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store for tests and offline runs.
//!
//! Behaves like Firestore from the core's point of view: every change to a
//! collection pushes a full snapshot to its subscribers, `create` refuses to
//! overwrite, and `update` touches only the fields it is given.

use super::{DocumentStore, SnapshotEvent, StoreError, Subscription};
use crate::models::{Document, Fields, Snapshot};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};

/// A write issued through the `DocumentStore` interface.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Create {
        collection: String,
        id: String,
        fields: Fields,
    },
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
}

struct Subscriber {
    events: mpsc::UnboundedSender<SnapshotEvent>,
    cancel: oneshot::Receiver<()>,
}

impl Subscriber {
    fn is_active(&mut self) -> bool {
        // A fired or dropped cancel sender both end the subscription.
        matches!(
            self.cancel.try_recv(),
            Err(oneshot::error::TryRecvError::Empty)
        ) && !self.events.is_closed()
    }
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    subscribers: HashMap<String, Vec<Subscriber>>,
    writes: Vec<WriteOp>,
    fail_reads: bool,
    fail_writes: bool,
    fail_subscribe: bool,
}

impl Inner {
    fn snapshot(&self, collection: &str) -> Snapshot {
        let documents = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Snapshot { documents }
    }

    fn send(&mut self, collection: &str, event: SnapshotEvent) {
        if let Some(subs) = self.subscribers.get_mut(collection) {
            subs.retain_mut(|sub| sub.is_active() && sub.events.send(event.clone()).is_ok());
        }
    }

    fn publish(&mut self, collection: &str) {
        let snapshot = self.snapshot(collection);
        self.send(collection, Ok(snapshot));
    }
}

/// In-memory `DocumentStore`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write a document directly, as another client would, and notify subscribers.
    pub fn put(&self, collection: &str, id: &str, fields: Fields) {
        let mut inner = self.lock();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        inner.publish(collection);
    }

    /// Delete a document directly and notify subscribers.
    pub fn remove(&self, collection: &str, id: &str) {
        let mut inner = self.lock();
        if let Some(docs) = inner.collections.get_mut(collection) {
            docs.remove(id);
        }
        inner.publish(collection);
    }

    /// Push an error to every subscriber of a collection.
    pub fn push_error(&self, collection: &str, message: &str) {
        self.lock()
            .send(collection, Err(StoreError::Backend(message.to_string())));
    }

    /// Current contents of a document.
    pub fn get(&self, collection: &str, id: &str) -> Option<Fields> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Writes issued through `create`/`update`, oldest first.
    pub fn writes(&self) -> Vec<WriteOp> {
        self.lock().writes.clone()
    }

    /// Number of subscriptions on a collection that have not been cancelled.
    pub fn active_subscriptions(&self, collection: &str) -> usize {
        let mut inner = self.lock();
        match inner.subscribers.get_mut(collection) {
            Some(subs) => {
                subs.retain_mut(|sub| sub.is_active());
                subs.len()
            }
            None => 0,
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        self.lock().fail_subscribe = fail;
    }
}

impl DocumentStore for MemoryStore {
    fn subscribe<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<Subscription, StoreError>> {
        async move {
            let mut inner = self.lock();
            if inner.fail_subscribe {
                return Err(StoreError::Backend("subscribe failed (injected)".to_string()));
            }

            let (subscription, events, cancel) = Subscription::channel();

            // Listeners always start with the current state.
            let _ = events.send(Ok(inner.snapshot(collection)));
            inner
                .subscribers
                .entry(collection.to_string())
                .or_default()
                .push(Subscriber { events, cancel });

            tracing::debug!(collection, "Memory subscription opened");
            Ok(subscription)
        }
        .boxed()
    }

    fn read<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Fields>, StoreError>> {
        async move {
            let inner = self.lock();
            if inner.fail_reads {
                return Err(StoreError::Backend("read failed (injected)".to_string()));
            }
            Ok(inner
                .collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .cloned())
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
            let mut inner = self.lock();
            if inner.fail_writes {
                return Err(StoreError::Backend("write failed (injected)".to_string()));
            }

            let docs = inner.collections.entry(collection.to_string()).or_default();
            if docs.contains_key(id) {
                return Err(StoreError::AlreadyExists {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
            docs.insert(id.to_string(), fields.clone());

            inner.writes.push(WriteOp::Create {
                collection: collection.to_string(),
                id: id.to_string(),
                fields: fields.clone(),
            });
            inner.publish(collection);
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
            let mut inner = self.lock();
            if inner.fail_writes {
                return Err(StoreError::Backend("write failed (injected)".to_string()));
            }

            let doc = inner
                .collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            for (key, value) in fields {
                doc.insert(key.clone(), value.clone());
            }

            inner.writes.push(WriteOp::Update {
                collection: collection.to_string(),
                id: id.to_string(),
                fields: fields.clone(),
            });
            inner.publish(collection);
            Ok(())
        }
        .boxed()
    }
}
