use std::sync::Arc;
use parking_lot::{Mutex, MutexGuard};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::store::DocumentStore;

/// A [`DocumentStore`] behind one exclusive lock, cloneable across threads.
/// Every call holds the lock for its whole duration, eviction and undo I/O
/// included.
#[derive(Clone)]
pub struct SharedDocumentStore {
    inner: Arc<Mutex<DocumentStore>>,
}

impl SharedDocumentStore {
    pub fn new(store: DocumentStore) -> Self {
        SharedDocumentStore {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn open(config: Config) -> Result<Self> {
        Ok(Self::new(DocumentStore::open(config)?))
    }

    /// Hold the lock across several calls.
    pub fn lock(&self) -> MutexGuard<'_, DocumentStore> {
        self.inner.lock()
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut DocumentStore) -> T) -> T {
        f(&mut *self.inner.lock())
    }
}
