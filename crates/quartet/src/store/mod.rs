//! Document store interface.
//!
//! The services consume a store through the narrow [`DocumentStore`] trait:
//! insert, point lookup, replace, delete and an unordered full scan. Documents
//! are schemaless JSON objects; decoding them into service types is the
//! service's job, so a malformed stored document surfaces as a decode failure
//! in the service rather than inside the store.

mod key;
mod memory;

pub use key::{DocumentKey, KEY_TEXT_LEN, KeyError};
pub use memory::MemoryStore;

use core::future::Future;
use futures::stream::BoxStream;

/// A stored document body.
pub type Document = serde_json::Map<String, serde_json::Value>;

pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Lazy, unordered sequence of stored records.
pub type RecordStream = BoxStream<'static, StoreResult<Record>>;

/// A document together with its key, as yielded by a scan.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub key: DocumentKey,
    pub document: Document,
}

/// Failures reported by a store implementation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or refused the operation.
    #[error("store unavailable: {context}")]
    Unavailable { context: String },

    /// The store generated a key that is already taken.
    #[error("duplicate key {key}")]
    DuplicateKey { key: DocumentKey },

    /// A scan failed part-way through.
    #[error("cursor failed: {context}")]
    Cursor { context: String },
}

/// Keyed document collection.
pub trait DocumentStore: Send + Sync + 'static {
    /// Inserts a document; the store assigns its key.
    fn insert(&self, document: Document) -> impl Future<Output = StoreResult<DocumentKey>> + Send;

    /// Looks up a document by key.
    fn find_by_key(
        &self,
        key: &DocumentKey,
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Replaces the document stored under `key`. Returns how many documents
    /// matched (0 or 1).
    fn replace(
        &self,
        key: &DocumentKey,
        document: Document,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Deletes the document stored under `key`. Returns how many documents
    /// were removed (0 or 1).
    fn delete_by_key(&self, key: &DocumentKey) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Scans the whole collection in no particular order.
    fn scan_all(&self) -> impl Future<Output = StoreResult<RecordStream>> + Send;
}
