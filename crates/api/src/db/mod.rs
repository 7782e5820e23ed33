//! Record storage.
//!
//! # Collections
//!
//! State lives in five JSON arrays inside the data directory:
//!
//! - `products.json` - Local inventory overlay (stock, overrides, custom products)
//! - `users.json` - Accounts with embedded addresses and cards
//! - `orders.json` - Placed orders
//! - `returns.json` - Return requests
//! - `analytics.json` - Most recent analytics events
//!
//! Every read loads a collection from storage and every write replaces it
//! wholesale. Handlers never touch a backend directly: they go through
//! [`Store`], which pairs a [`RecordStore`] with the process-wide write lock
//! taken around each read-modify-write.

mod json;

pub use json::JsonFileStore;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use kranes_core::{AnalyticsEvent, InventoryRecord, OrderRecord, ReturnRecord, UserRecord};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Reading or writing a collection file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored data could not be decoded.
    #[error("data corruption in {collection}: {message}")]
    DataCorruption {
        collection: Collection,
        message: String,
    },

    /// Records could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Users,
    Orders,
    Returns,
    Analytics,
}

impl Collection {
    /// Every collection, in initialization order.
    pub const ALL: [Self; 5] = [
        Self::Products,
        Self::Users,
        Self::Orders,
        Self::Returns,
        Self::Analytics,
    ];

    /// File name of the collection inside the data directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Products => "products.json",
            Self::Users => "users.json",
            Self::Orders => "orders.json",
            Self::Returns => "returns.json",
            Self::Analytics => "analytics.json",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Storage backend for the five record collections.
///
/// Implementations load a whole collection on read and replace it on write.
/// A collection that has never been written reads as empty.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create any missing collections as empty arrays, keeping existing ones.
    async fn ensure_initialized(&self) -> Result<(), RepositoryError>;

    async fn products(&self) -> Result<Vec<InventoryRecord>, RepositoryError>;
    async fn save_products(&self, products: &[InventoryRecord]) -> Result<(), RepositoryError>;

    async fn users(&self) -> Result<Vec<UserRecord>, RepositoryError>;
    async fn save_users(&self, users: &[UserRecord]) -> Result<(), RepositoryError>;

    async fn orders(&self) -> Result<Vec<OrderRecord>, RepositoryError>;
    async fn save_orders(&self, orders: &[OrderRecord]) -> Result<(), RepositoryError>;

    async fn returns(&self) -> Result<Vec<ReturnRecord>, RepositoryError>;
    async fn save_returns(&self, returns: &[ReturnRecord]) -> Result<(), RepositoryError>;

    async fn analytics(&self) -> Result<Vec<AnalyticsEvent>, RepositoryError>;
    async fn save_analytics(&self, events: &[AnalyticsEvent]) -> Result<(), RepositoryError>;
}

/// Shared handle to the record backend plus the write lock.
///
/// Mutating services hold the guard from [`Store::lock`] for the whole
/// load-modify-save sequence so two requests in this process cannot
/// interleave their writes. There is no cross-process locking.
pub struct Store {
    records: Arc<dyn RecordStore>,
    write_lock: Mutex<()>,
}

impl Store {
    /// Wrap a record backend.
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
            write_lock: Mutex::new(()),
        }
    }

    /// Store backed by JSON files in `data_dir`.
    #[must_use]
    pub fn json(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(JsonFileStore::new(data_dir)))
    }

    /// The record backend.
    #[must_use]
    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    /// A new owning handle to the record backend.
    #[must_use]
    pub fn shared(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.records)
    }

    /// Acquire the process-wide write lock.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}
