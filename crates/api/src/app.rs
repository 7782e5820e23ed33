//! Router assembly and startup tasks.

use std::time::Duration;

use axum::{
    Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware as axum_middleware,
};
use secrecy::ExposeSecret;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::{Span, info, warn};

use crate::db::RepositoryError;
use crate::middleware::{REQUEST_ID_HEADER, request_id_middleware};
use crate::routes;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Maximum accepted request body size (1 MiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_origins);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the configured storefront origins, with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-session-id"),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

/// Errors that can occur while preparing the data directory.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to initialize data directory: {0}")]
    Repository(#[from] RepositoryError),

    #[error("failed to create bootstrap admin: {0}")]
    Auth(#[from] AuthError),
}

/// Create missing collection files and the bootstrap admin.
///
/// If the bootstrap email is already taken by a non-admin account, a warning
/// is logged and startup continues without an admin.
///
/// # Errors
///
/// Returns an error if the data directory cannot be written.
pub async fn initialize(state: &AppState) -> Result<(), StartupError> {
    state.store().records().ensure_initialized().await?;

    let admin = &state.config().bootstrap_admin;
    match state
        .auth()
        .bootstrap_admin(&admin.email, admin.password.expose_secret(), &admin.name)
        .await
    {
        Ok(Some(_)) => info!(email = %admin.email, "Admin login email"),
        Ok(None) => {}
        Err(AuthError::UserAlreadyExists) => {
            warn!(email = %admin.email, "Bootstrap admin email belongs to a non-admin account");
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use secrecy::SecretString;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::{ApiConfig, AuthConfig, BootstrapAdmin, CatalogConfig};

    fn test_config(data_dir: &std::path::Path) -> ApiConfig {
        ApiConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            data_dir: data_dir.to_path_buf(),
            auth: AuthConfig {
                jwt_secret: SecretString::from("q8Z!r2Lx@9vT#m4Kp$7wN&e1Yb^c6Hs"),
                token_ttl: Duration::from_secs(3600),
            },
            catalog: CatalogConfig {
                // Nothing listens here; these tests never reach the catalog.
                base_url: Url::parse("http://127.0.0.1:9").unwrap(),
                cache_ttl: Duration::from_secs(60),
                timeout: Duration::from_secs(1),
            },
            bootstrap_admin: BootstrapAdmin::default(),
            cors_origins: vec!["http://localhost:5173".to_string()],
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    fn router(data_dir: &std::path::Path) -> Router {
        build_router(AppState::new(test_config(data_dir)).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_has_request_id() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(dir.path())
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "status": "ok", "service": "kranes-api" })
        );
    }

    #[tokio::test]
    async fn test_upstream_request_id_is_echoed() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(dir.path())
            .oneshot(
                Request::get("/api/health")
                    .header(REQUEST_ID_HEADER, "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-123");
    }

    #[tokio::test]
    async fn test_unknown_api_route() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(dir.path())
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "API route not found");
    }

    #[tokio::test]
    async fn test_protected_route_requires_bearer() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(dir.path())
            .oneshot(Request::get("/api/account/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_initialize_creates_files_and_admin() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(test_config(dir.path())).unwrap();

        initialize(&state).await.unwrap();
        initialize(&state).await.unwrap();

        assert!(dir.path().join("analytics.json").exists());
        let users = state.store().records().users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].is_admin());
    }
}
