//! HTTP client for the remote product catalog.
//!
//! Fetches `GET {base_url}/products` and keeps the raw response in a `moka`
//! cache under a single fixed key, so the remote API is hit at most once per
//! TTL window. Failures are not cached and not retried.

use std::sync::Arc;

use moka::future::Cache;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::CatalogConfig;

use super::CatalogError;
use super::types::RawProduct;

const RAW_PRODUCTS_KEY: &str = "remote:products";

/// Client for the remote catalog API.
#[derive(Clone)]
pub struct RemoteCatalogClient {
    inner: Arc<RemoteCatalogClientInner>,
}

struct RemoteCatalogClientInner {
    client: reqwest::Client,
    products_url: Url,
    cache: Cache<&'static str, Arc<Vec<RawProduct>>>,
}

impl RemoteCatalogClient {
    /// Create a new remote catalog client.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Url` if the products endpoint cannot be derived
    /// from the base URL, or `CatalogError::Http` if the HTTP client cannot be
    /// built.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let products_url = products_url(&config.base_url)?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(RemoteCatalogClientInner {
                client,
                products_url,
                cache,
            }),
        })
    }

    /// The endpoint products are fetched from.
    #[must_use]
    pub fn products_url(&self) -> &Url {
        &self.inner.products_url
    }

    /// Fetch the remote product list, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Http` if the request fails,
    /// `CatalogError::Status` on a non-success response and
    /// `CatalogError::Parse` if the body is not a product list.
    #[instrument(skip(self), fields(url = %self.inner.products_url))]
    pub async fn fetch_products(&self) -> Result<Arc<Vec<RawProduct>>, CatalogError> {
        if let Some(products) = self.inner.cache.get(RAW_PRODUCTS_KEY).await {
            debug!("Cache hit for remote products");
            return Ok(products);
        }

        let response = self
            .inner
            .client
            .get(self.inner.products_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Remote catalog request failed");
            return Err(CatalogError::Status(status));
        }

        let body = response.text().await?;
        let products: Vec<RawProduct> = serde_json::from_str(&body)?;
        debug!(count = products.len(), "Fetched remote products");

        let products = Arc::new(products);
        self.inner
            .cache
            .insert(RAW_PRODUCTS_KEY, Arc::clone(&products))
            .await;

        Ok(products)
    }
}

/// `{base_url}/products`, keeping any path prefix on the base URL.
fn products_url(base_url: &Url) -> Result<Url, CatalogError> {
    let base = base_url.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}/products"))?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_products_url() {
        let root = Url::parse("https://fakestoreapi.com").unwrap();
        assert_eq!(
            products_url(&root).unwrap().as_str(),
            "https://fakestoreapi.com/products"
        );

        let prefixed = Url::parse("http://127.0.0.1:9000/v1/").unwrap();
        assert_eq!(
            products_url(&prefixed).unwrap().as_str(),
            "http://127.0.0.1:9000/v1/products"
        );
    }

    #[test]
    fn test_raw_product_parses_remote_shape() {
        let body = r#"[{
            "id": 1,
            "title": "Fjallraven Backpack",
            "price": 109.95,
            "description": "Your perfect pack",
            "category": "men's clothing",
            "image": "https://fakestoreapi.com/img/81fPKd-2AYL._AC_SL1500_.jpg",
            "rating": { "rate": 3.9, "count": 120 }
        }]"#;

        let products: Vec<RawProduct> = serde_json::from_str(body).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, "109.95".parse().unwrap());
        assert_eq!(products[0].rating.count, 120);
    }
}
