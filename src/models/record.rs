//! Opaque documents delivered by collection snapshots.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw document fields. The schema belongs to whoever writes the collection.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Mirror contents: document ID to record.
pub type Records = HashMap<String, Record>;

/// A single document as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// A complete point-in-time listing of a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Convert into mirror records, tagging each with its document ID.
    pub fn into_records(self) -> Records {
        self.documents
            .into_iter()
            .map(|doc| {
                let record = Record {
                    id: doc.id.clone(),
                    fields: doc.fields,
                };
                (doc.id, record)
            })
            .collect()
    }
}

/// A mirrored document: its fields plus its own `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

/// Serialize a typed value into document fields.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(value)?)
}
