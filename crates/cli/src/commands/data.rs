//! Data directory commands.
//!
//! # Usage
//!
//! ```bash
//! kranes data init --data-dir ./data
//! ```

use std::path::Path;

use kranes_api::db::{Collection, JsonFileStore, RecordStore, RepositoryError};

/// Create any missing collection files as empty arrays.
///
/// Existing files are left untouched, so this is safe to run against a live
/// data directory.
pub async fn init(data_dir: &Path) -> Result<(), RepositoryError> {
    let store = JsonFileStore::new(data_dir);
    store.ensure_initialized().await?;

    for collection in Collection::ALL {
        tracing::info!(
            "{} ready",
            data_dir.join(collection.file_name()).display()
        );
    }

    Ok(())
}
