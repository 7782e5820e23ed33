//! Query page cache against catalog writes that race an in-flight query.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use kranes_api::catalog::{CatalogService, ProductQueryParams};
use kranes_api::db::{JsonFileStore, RecordStore, RepositoryError};
use kranes_core::{
    AnalyticsEvent, InventoryRecord, OrderRecord, ProductId, ReturnRecord, UserRecord,
};
use kranes_integration_tests::stub_catalog;

/// JSON store whose next inventory read returns its rows only after a pause.
struct SlowInventory {
    inner: JsonFileStore,
    delay_next: AtomicBool,
}

impl SlowInventory {
    fn delay_next_read(&self) {
        self.delay_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for SlowInventory {
    async fn ensure_initialized(&self) -> Result<(), RepositoryError> {
        self.inner.ensure_initialized().await
    }

    async fn products(&self) -> Result<Vec<InventoryRecord>, RepositoryError> {
        let rows = self.inner.products().await?;
        if self.delay_next.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(400)).await;
        }
        Ok(rows)
    }

    async fn save_products(&self, products: &[InventoryRecord]) -> Result<(), RepositoryError> {
        self.inner.save_products(products).await
    }

    async fn users(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        self.inner.users().await
    }

    async fn save_users(&self, users: &[UserRecord]) -> Result<(), RepositoryError> {
        self.inner.save_users(users).await
    }

    async fn orders(&self) -> Result<Vec<OrderRecord>, RepositoryError> {
        self.inner.orders().await
    }

    async fn save_orders(&self, orders: &[OrderRecord]) -> Result<(), RepositoryError> {
        self.inner.save_orders(orders).await
    }

    async fn returns(&self) -> Result<Vec<ReturnRecord>, RepositoryError> {
        self.inner.returns().await
    }

    async fn save_returns(&self, returns: &[ReturnRecord]) -> Result<(), RepositoryError> {
        self.inner.save_returns(returns).await
    }

    async fn analytics(&self) -> Result<Vec<AnalyticsEvent>, RepositoryError> {
        self.inner.analytics().await
    }

    async fn save_analytics(&self, events: &[AnalyticsEvent]) -> Result<(), RepositoryError> {
        self.inner.save_analytics(events).await
    }
}

fn search(text: &str) -> ProductQueryParams {
    ProductQueryParams {
        q: Some(text.to_string()),
        ..ProductQueryParams::default()
    }
}

#[tokio::test]
async fn test_page_read_before_a_stock_change_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let records = Arc::new(SlowInventory {
        inner: JsonFileStore::new(dir.path()),
        delay_next: AtomicBool::new(false),
    });
    let store: Arc<dyn RecordStore> = Arc::<SlowInventory>::clone(&records);
    let catalog = CatalogService::new(&stub_catalog().await, store).unwrap();

    let product = catalog.product(ProductId::new(12)).await.unwrap().unwrap();
    assert_eq!(product.stock, 120);

    // This query reads the inventory, then stalls before caching its page.
    records.delay_next_read();
    let in_flight = tokio::spawn({
        let catalog = catalog.clone();
        async move { catalog.query(&search("stub product 12")).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Meanwhile two units sell, the way order placement writes them.
    let mut row = InventoryRecord::active(product);
    row.product.stock = 118;
    records.save_products(&[row]).await.unwrap();
    catalog.invalidate_queries();

    let stale = in_flight.await.unwrap().unwrap();
    assert_eq!(stale.items[0].stock, 120);

    let fresh = catalog.query(&search("stub product 12")).await.unwrap();
    assert_eq!(fresh.items[0].id, ProductId::new(12));
    assert_eq!(fresh.items[0].stock, 118);
}

#[tokio::test]
async fn test_unchanged_catalog_pages_are_cached() {
    let dir = tempfile::tempdir().unwrap();
    let records = Arc::new(SlowInventory {
        inner: JsonFileStore::new(dir.path()),
        delay_next: AtomicBool::new(false),
    });
    let store: Arc<dyn RecordStore> = Arc::<SlowInventory>::clone(&records);
    let catalog = CatalogService::new(&stub_catalog().await, store).unwrap();

    let first = catalog.query(&search("stub product 12")).await.unwrap();

    // A cached page never touches the store, so no pause happens here.
    records.delay_next_read();
    let second = catalog.query(&search("stub product 12")).await.unwrap();

    assert_eq!(first.items, second.items);
    assert!(records.delay_next.load(Ordering::SeqCst));
}
