//! Product catalog: remote feed, local overlay and cached queries.
//!
//! # Architecture
//!
//! - [`RemoteCatalogClient`] fetches the third-party product list and caches
//!   the raw response for the configured TTL
//! - [`merge_catalog`] overlays local inventory rows onto the remote feed
//! - [`run_query`] filters, sorts and paginates the merged catalog
//! - [`CatalogService`] ties them together and caches result pages keyed by
//!   the normalized query; any catalog mutation must call
//!   [`CatalogService::invalidate_queries`]

mod client;
mod merge;
mod query;
pub mod types;

pub use client::RemoteCatalogClient;
pub use merge::merge_catalog;
pub use query::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageMeta, ProductPage, ProductQuery, ProductQueryParams,
    SortOrder, run_query,
};
pub use types::RawProduct;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use kranes_core::{Product, ProductId};

use crate::config::CatalogConfig;
use crate::db::{RecordStore, RepositoryError};

/// Maximum number of cached result pages.
const QUERY_CACHE_CAPACITY: u64 = 150;

/// Errors that can occur when reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request to the remote catalog failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote catalog answered with a non-success status.
    #[error("Remote catalog failed ({0})")]
    Status(reqwest::StatusCode),

    /// Remote catalog body was not a product list.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Catalog endpoint URL is invalid.
    #[error("Invalid catalog URL: {0}")]
    Url(#[from] url::ParseError),

    /// Local inventory could not be read.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CatalogError {
    /// Whether the failure came from the remote catalog rather than local state.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status(_) | Self::Parse(_))
    }
}

/// Merged catalog reads with a cache of query result pages.
#[derive(Clone)]
pub struct CatalogService {
    remote: RemoteCatalogClient,
    records: Arc<dyn RecordStore>,
    queries: Cache<String, ProductPage>,
    /// Bumped by every invalidation. A page computed across a bump is not kept.
    generation: Arc<AtomicU64>,
}

impl CatalogService {
    /// Create a catalog service reading local inventory from `records`.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote client cannot be created.
    pub fn new(config: &CatalogConfig, records: Arc<dyn RecordStore>) -> Result<Self, CatalogError> {
        let queries = Cache::builder()
            .max_capacity(QUERY_CACHE_CAPACITY)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            remote: RemoteCatalogClient::new(config)?,
            records,
            queries,
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    /// The remote catalog client.
    #[must_use]
    pub const fn remote(&self) -> &RemoteCatalogClient {
        &self.remote
    }

    /// The full merged catalog: active products only.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote catalog or local inventory cannot be read.
    pub async fn merged(&self) -> Result<Vec<Product>, CatalogError> {
        let remote = self.remote.fetch_products().await?;
        let local = self.records.products().await?;
        Ok(merge_catalog(remote.as_ref().clone(), &local))
    }

    /// Look up one active product.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.merged().await?.into_iter().find(|p| p.id == id))
    }

    /// Distinct categories in catalog order.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        let mut categories: Vec<String> = Vec::new();
        for product in self.merged().await? {
            if !categories.contains(&product.category) {
                categories.push(product.category);
            }
        }
        Ok(categories)
    }

    /// Run a catalog query, served from the page cache when possible.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    #[instrument(skip(self, params))]
    pub async fn query(&self, params: &ProductQueryParams) -> Result<ProductPage, CatalogError> {
        let query = ProductQuery::from(params);
        let key = query.cache_key();

        if let Some(page) = self.queries.get(&key).await {
            debug!(%key, "Cache hit for product query");
            return Ok(page);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let page = run_query(self.merged().await?, &query);

        if self.generation.load(Ordering::Acquire) == generation {
            self.queries.insert(key.clone(), page.clone()).await;
            // An invalidation can land between the check and the insert.
            if self.generation.load(Ordering::Acquire) != generation {
                self.queries.invalidate(&key).await;
            }
        } else {
            debug!(%key, "Catalog changed during query, page not cached");
        }

        Ok(page)
    }

    /// Drop every cached result page. Call after any catalog mutation.
    pub fn invalidate_queries(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.queries.invalidate_all();
        debug!("Product query cache invalidated");
    }
}
