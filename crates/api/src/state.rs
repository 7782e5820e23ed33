//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::{CatalogError, CatalogService};
use crate::config::ApiConfig;
use crate::db::Store;
use crate::services::account::AccountService;
use crate::services::admin::AdminService;
use crate::services::analytics::AnalyticsService;
use crate::services::auth::AuthService;
use crate::services::orders::OrderService;
use crate::services::tokens::TokenService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// record store, the catalog and its caches, and the token signer.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Store,
    catalog: CatalogService,
    tokens: TokenService,
}

impl AppState {
    /// Create application state backed by JSON files in `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog client cannot be created.
    pub fn new(config: ApiConfig) -> Result<Self, CatalogError> {
        let store = Store::json(&config.data_dir);
        Self::with_store(config, store)
    }

    /// Create application state around an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog client cannot be created.
    pub fn with_store(config: ApiConfig, store: Store) -> Result<Self, CatalogError> {
        let catalog = CatalogService::new(&config.catalog, store.shared())?;
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                catalog,
                tokens,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the record store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the session token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.store(), self.tokens())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store(), self.catalog())
    }

    #[must_use]
    pub fn account(&self) -> AccountService<'_> {
        AccountService::new(self.store())
    }

    #[must_use]
    pub fn admin(&self) -> AdminService<'_> {
        AdminService::new(self.store(), self.catalog())
    }

    #[must_use]
    pub fn analytics(&self) -> AnalyticsService<'_> {
        AnalyticsService::new(self.store())
    }
}
