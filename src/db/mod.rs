//! Document store layer (Firestore, or in-process for tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::models::{Fields, Snapshot};
use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};

/// Collection names as constants.
pub mod collections {
    pub const TRIPS: &str = "trips";
    pub const USERS: &str = "users";
}

/// Document store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Invalid document data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Backend(String),
}

/// One item pushed by a collection subscription.
pub type SnapshotEvent = Result<Snapshot, StoreError>;

/// An open collection subscription.
///
/// `events` yields a full snapshot on every change. Sending on (or dropping)
/// `cancel` tells the store to stop listening.
pub struct Subscription {
    pub events: mpsc::UnboundedReceiver<SnapshotEvent>,
    pub cancel: oneshot::Sender<()>,
}

impl Subscription {
    /// Create a subscription and the store-side ends of its channels.
    pub fn channel() -> (
        Self,
        mpsc::UnboundedSender<SnapshotEvent>,
        oneshot::Receiver<()>,
    ) {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (cancel, cancel_rx) = oneshot::channel();
        (Self { events, cancel }, events_tx, cancel_rx)
    }
}

/// Operations the core needs from a realtime document store.
pub trait DocumentStore: Send + Sync {
    /// Subscribe to full snapshots of a collection.
    fn subscribe<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<Subscription, StoreError>>;

    /// Point-read a single document.
    fn read<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Fields>, StoreError>>;

    /// Create a document. Fails with `AlreadyExists` instead of overwriting.
    fn create<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: &'a Fields,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Update only the given fields of an existing document.
    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: &'a Fields,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}
