//! End-to-end test harness for the Kranes Market API.
//!
//! Each [`TestContext`] starts two servers on ephemeral ports:
//!
//! - a stub of the remote catalog serving a fixed 50 product list, which can
//!   be switched into a failure mode
//! - the real API router, backed by a fresh temporary data directory
//!
//! Tests then talk to the API over HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kranes-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use url::Url;

use kranes_api::config::{AuthConfig, BootstrapAdmin, CatalogConfig};
use kranes_api::{ApiConfig, AppState, build_router, initialize};

/// Number of products served by the stub catalog.
pub const STUB_PRODUCT_COUNT: i64 = 50;

/// Categories assigned round-robin to stub products.
pub const STUB_CATEGORIES: [&str; 5] = [
    "electronics",
    "jewelery",
    "men's clothing",
    "women's clothing",
    "home",
];

/// Password used for every account registered through [`TestContext::register`].
pub const TEST_PASSWORD: &str = "correct-horse-42";

const ADMIN_EMAIL: &str = "admin@kranes.market";
const ADMIN_PASSWORD: &str = "Admin123!";

#[derive(Default)]
struct StubCatalog {
    failing: AtomicBool,
    hits: AtomicUsize,
}

/// A running API instance plus its stub catalog.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    catalog: Arc<StubCatalog>,
    data_dir: TempDir,
}

impl TestContext {
    /// Start a stub catalog and an initialized API server.
    pub async fn new() -> Self {
        Self::start(false).await
    }

    /// Start with the stub catalog already failing, so nothing gets cached.
    pub async fn with_failing_catalog() -> Self {
        Self::start(true).await
    }

    async fn start(failing: bool) -> Self {
        let catalog = Arc::new(StubCatalog::default());
        catalog.failing.store(failing, Ordering::SeqCst);
        let catalog_addr = spawn(stub_catalog_router(Arc::clone(&catalog))).await;

        let data_dir = tempfile::tempdir().expect("Failed to create data dir");
        let config = test_config(&data_dir, catalog_addr);
        let state = AppState::new(config).expect("Failed to create app state");
        initialize(&state).await.expect("Failed to initialize store");

        let api_addr = spawn(build_router(state)).await;

        Self {
            client: Client::builder()
                .build()
                .expect("Failed to create HTTP client"),
            base_url: format!("http://{api_addr}/api"),
            catalog,
            data_dir,
        }
    }

    /// Absolute URL for an `/api` relative path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Directory holding this instance's record files.
    #[must_use]
    pub fn data_dir(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Make the stub catalog answer 503 from now on.
    pub fn fail_catalog(&self) {
        self.catalog.failing.store(true, Ordering::SeqCst);
    }

    /// Requests the stub catalog has received.
    #[must_use]
    pub fn catalog_hits(&self) -> usize {
        self.catalog.hits.load(Ordering::SeqCst)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str, body: &Value) -> RequestBuilder {
        self.client.post(self.url(path)).json(body)
    }

    pub fn patch(&self, path: &str, body: &Value) -> RequestBuilder {
        self.client.patch(self.url(path)).json(body)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Register a customer and return the session token.
    pub async fn register(&self, email: &str) -> String {
        let resp = self
            .post(
                "/auth/register",
                &json!({ "email": email, "password": TEST_PASSWORD, "name": "Test Shopper" }),
            )
            .send()
            .await
            .expect("Failed to register");
        assert_eq!(resp.status(), StatusCode::CREATED);
        token_of(resp).await
    }

    /// Log in as the bootstrap admin and return the session token.
    pub async fn admin_token(&self) -> String {
        let resp = self
            .post(
                "/auth/login",
                &json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .send()
            .await
            .expect("Failed to log in as admin");
        assert_eq!(resp.status(), StatusCode::OK);
        token_of(resp).await
    }

    /// Save an address for the token's user and return its id.
    pub async fn add_address(&self, token: &str) -> String {
        let resp = self
            .post("/account/addresses", &sample_address())
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to add address");
        assert_eq!(resp.status(), StatusCode::CREATED);
        id_of(resp).await
    }

    /// Save a Visa card for the token's user and return its id.
    pub async fn add_card(&self, token: &str) -> String {
        let resp = self
            .post(
                "/account/cards",
                &json!({
                    "holderName": "Test Shopper",
                    "cardNumber": "4242 4242 4242 4242",
                    "expMonth": "12",
                    "expYear": "2030"
                }),
            )
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to add card");
        assert_eq!(resp.status(), StatusCode::CREATED);
        id_of(resp).await
    }

    /// Register a customer with a saved address and card.
    ///
    /// Returns `(token, address_id, card_id)`.
    pub async fn shopper(&self, email: &str) -> (String, String, String) {
        let token = self.register(email).await;
        let address_id = self.add_address(&token).await;
        let card_id = self.add_card(&token).await;
        (token, address_id, card_id)
    }
}

/// A valid address payload.
#[must_use]
pub fn sample_address() -> Value {
    json!({
        "label": "Home",
        "fullName": "Test Shopper",
        "phone": "+1 555 0100",
        "addressLine1": "1 Market Street",
        "city": "Springfield",
        "country": "US",
        "postalCode": "12345"
    })
}

/// Parse a JSON response body.
pub async fn body(resp: Response) -> Value {
    resp.json().await.expect("Response body is not JSON")
}

/// The `message` of an error response.
pub async fn message(resp: Response) -> String {
    body(resp).await["message"]
        .as_str()
        .expect("Error body has no message")
        .to_string()
}

async fn token_of(resp: Response) -> String {
    body(resp).await["token"]
        .as_str()
        .expect("Session has no token")
        .to_string()
}

async fn id_of(resp: Response) -> String {
    body(resp).await["id"]
        .as_str()
        .expect("Record has no id")
        .to_string()
}

/// The stub catalog product with `id`.
///
/// Products 1 to 6 are rated 3.5, everything later between 4.0 and 4.9.
/// Every fifth product, starting at 1, is in `electronics`, so exactly eight
/// electronics products are rated 4 or higher.
#[must_use]
pub fn stub_product(id: i64) -> Value {
    let category = usize::try_from(id - 1)
        .ok()
        .and_then(|index| STUB_CATEGORIES.get(index % STUB_CATEGORIES.len()))
        .copied()
        .unwrap_or("electronics");
    let rate = if id <= 6 {
        3.5
    } else {
        4.0 + f64::from(u32::try_from(id % 10).unwrap_or(0)) / 10.0
    };

    json!({
        "id": id,
        "title": format!("Stub Product {id}"),
        "price": f64::from(u32::try_from(id).unwrap_or(0)) + 0.99,
        "description": format!("Description of stub product {id}"),
        "category": category,
        "image": format!("https://images.example.org/{id}.jpg"),
        "rating": { "rate": rate, "count": id * 10 }
    })
}

/// Start a standalone healthy stub catalog and return a config pointing at it.
///
/// For tests that drive `CatalogService` directly instead of over HTTP.
pub async fn stub_catalog() -> CatalogConfig {
    catalog_config(spawn(stub_catalog_router(Arc::default())).await)
}

fn stub_catalog_router(catalog: Arc<StubCatalog>) -> Router {
    Router::new()
        .route("/products", get(stub_products))
        .with_state(catalog)
}

async fn stub_products(
    State(catalog): State<Arc<StubCatalog>>,
) -> Result<Json<Vec<Value>>, StatusCode> {
    catalog.hits.fetch_add(1, Ordering::SeqCst);
    if catalog.failing.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json((1..=STUB_PRODUCT_COUNT).map(stub_product).collect()))
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    addr
}

fn test_config(data_dir: &TempDir, catalog_addr: SocketAddr) -> ApiConfig {
    ApiConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        data_dir: data_dir.path().to_path_buf(),
        auth: AuthConfig {
            jwt_secret: SecretString::from("q8Z!r2Lx@9vT#m4Kp$7wN&e1Yb^c6Hs"),
            token_ttl: Duration::from_secs(3600),
        },
        catalog: catalog_config(catalog_addr),
        bootstrap_admin: BootstrapAdmin::default(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        sentry_dsn: None,
        sentry_environment: None,
    }
}

fn catalog_config(catalog_addr: SocketAddr) -> CatalogConfig {
    CatalogConfig {
        base_url: Url::parse(&format!("http://{catalog_addr}"))
            .expect("Stub catalog address is not a URL"),
        cache_ttl: Duration::from_secs(60),
        timeout: Duration::from_secs(5),
    }
}
