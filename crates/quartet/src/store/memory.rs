use super::{Document, DocumentKey, DocumentStore, Record, RecordStream, StoreError, StoreResult};
use futures::StreamExt;
use parking_lot::RwLock;
use portable_atomic::{AtomicBool, Ordering};
use std::collections::{HashMap, hash_map::Entry};

/// In-process [`DocumentStore`] backed by a hash map.
///
/// Scans snapshot the collection and yield it in hash order. The store can be
/// switched offline, after which every operation fails with
/// [`StoreError::Unavailable`].
#[derive(Debug)]
pub struct MemoryStore {
    documents: RwLock<HashMap<DocumentKey, Document>>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                context: "memory store is offline".to_string(),
            })
        }
    }

    /// Stores `document` under `key`, refusing to overwrite an existing one.
    fn insert_at(&self, key: DocumentKey, document: Document) -> StoreResult<DocumentKey> {
        match self.documents.write().entry(key) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey { key }),
            Entry::Vacant(slot) => {
                slot.insert(document);
                tracing::trace!("Inserted document {key}");
                Ok(key)
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    async fn insert(&self, document: Document) -> StoreResult<DocumentKey> {
        self.ensure_available()?;
        self.insert_at(DocumentKey::generate(), document)
    }

    async fn find_by_key(&self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        self.ensure_available()?;
        Ok(self.documents.read().get(key).cloned())
    }

    async fn replace(&self, key: &DocumentKey, document: Document) -> StoreResult<u64> {
        self.ensure_available()?;
        let mut documents = self.documents.write();
        match documents.get_mut(key) {
            Some(existing) => {
                *existing = document;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_key(&self, key: &DocumentKey) -> StoreResult<u64> {
        self.ensure_available()?;
        Ok(u64::from(self.documents.write().remove(key).is_some()))
    }

    async fn scan_all(&self) -> StoreResult<RecordStream> {
        self.ensure_available()?;
        let records: Vec<_> = self
            .documents
            .read()
            .iter()
            .map(|(key, document)| {
                Ok(Record {
                    key: *key,
                    document: document.clone(),
                })
            })
            .collect();
        Ok(futures::stream::iter(records).boxed())
    }
}
