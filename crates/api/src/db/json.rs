//! JSON file backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use kranes_core::{AnalyticsEvent, InventoryRecord, OrderRecord, ReturnRecord, UserRecord};

use super::{Collection, RecordStore, RepositoryError};

/// Record store keeping each collection in a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `data_dir`. Nothing is touched until first use.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory holding the collection files.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    async fn read<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, RepositoryError> {
        let path = self.path(collection);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(%collection, "collection file missing, reading as empty");
                return Ok(Vec::new());
            }
            Err(source) => return Err(RepositoryError::Io { path, source }),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|e| RepositoryError::DataCorruption {
            collection,
            message: e.to_string(),
        })
    }

    /// Replace a collection file. Writes go to a sibling temp file first and
    /// are renamed into place.
    async fn write<T: Serialize + Sync>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> Result<(), RepositoryError> {
        let body = serde_json::to_string_pretty(records)?;
        let path = self.path(collection);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| RepositoryError::Io {
                path: self.data_dir.clone(),
                source,
            })?;
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|source| RepositoryError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| RepositoryError::Io { path, source })?;

        debug!(%collection, count = records.len(), "collection written");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    #[instrument(skip(self), fields(data_dir = %self.data_dir.display()))]
    async fn ensure_initialized(&self) -> Result<(), RepositoryError> {
        for collection in Collection::ALL {
            let path = self.path(collection);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }
            self.write::<serde_json::Value>(collection, &[]).await?;
        }
        Ok(())
    }

    async fn products(&self) -> Result<Vec<InventoryRecord>, RepositoryError> {
        self.read(Collection::Products).await
    }

    async fn save_products(&self, products: &[InventoryRecord]) -> Result<(), RepositoryError> {
        self.write(Collection::Products, products).await
    }

    async fn users(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        self.read(Collection::Users).await
    }

    async fn save_users(&self, users: &[UserRecord]) -> Result<(), RepositoryError> {
        self.write(Collection::Users, users).await
    }

    async fn orders(&self) -> Result<Vec<OrderRecord>, RepositoryError> {
        self.read(Collection::Orders).await
    }

    async fn save_orders(&self, orders: &[OrderRecord]) -> Result<(), RepositoryError> {
        self.write(Collection::Orders, orders).await
    }

    async fn returns(&self) -> Result<Vec<ReturnRecord>, RepositoryError> {
        self.read(Collection::Returns).await
    }

    async fn save_returns(&self, returns: &[ReturnRecord]) -> Result<(), RepositoryError> {
        self.write(Collection::Returns, returns).await
    }

    async fn analytics(&self) -> Result<Vec<AnalyticsEvent>, RepositoryError> {
        self.read(Collection::Analytics).await
    }

    async fn save_analytics(&self, events: &[AnalyticsEvent]) -> Result<(), RepositoryError> {
        self.write(Collection::Analytics, events).await
    }
}
