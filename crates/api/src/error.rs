//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`, and every error body is `{"message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::db::RepositoryError;
use crate::services::account::AccountError;
use crate::services::admin::AdminError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;

const INTERNAL_MESSAGE: &str = "Internal server error";
const UPSTREAM_MESSAGE: &str = "Product catalog is unavailable";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Record store operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Catalog read failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order placement failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Account operation failed.
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    /// Admin operation failed.
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status and client-facing message.
    ///
    /// Server errors never expose their details.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Repository(_) => internal(),
            Self::Catalog(err) => catalog(err),
            Self::Auth(err) => auth(err),
            Self::Order(err) => match err {
                OrderError::InvalidPayload
                | OrderError::TotalOutOfRange
                | OrderError::InvalidSelection
                | OrderError::ProductNotFound(_)
                | OrderError::InsufficientStock(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                OrderError::UserNotFound => (StatusCode::NOT_FOUND, err.to_string()),
                OrderError::Catalog(inner) => catalog(inner),
                OrderError::Repository(_) => internal(),
            },
            Self::Account(err) => match err {
                AccountError::UserNotFound | AccountError::OrderNotFound => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                AccountError::Repository(_) => internal(),
            },
            Self::Admin(err) => match err {
                AdminError::ProductNotFound
                | AdminError::ProductNotManaged
                | AdminError::OrderNotFound
                | AdminError::ReturnNotFound => (StatusCode::NOT_FOUND, err.to_string()),
                AdminError::Catalog(inner) => catalog(inner),
                AdminError::Repository(_) => internal(),
            },
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

fn internal() -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
}

fn catalog(err: &CatalogError) -> (StatusCode, String) {
    if err.is_upstream() {
        (StatusCode::BAD_GATEWAY, UPSTREAM_MESSAGE.to_string())
    } else {
        internal()
    }
}

fn auth(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".into()),
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token".into()),
        AuthError::UserNotFound => (StatusCode::UNAUTHORIZED, "User not found".into()),
        AuthError::UserAlreadyExists => (StatusCode::CONFLICT, "Email already in use".into()),
        AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => (
            StatusCode::BAD_REQUEST,
            "Invalid registration payload".into(),
        ),
        AuthError::TokenSigning(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
            internal()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                status = status.as_u16(),
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
///
/// Called by the auth extractors so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use kranes_core::ProductId;

    use crate::db::Collection;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product not found".to_string());
        assert_eq!(err.to_string(), "Not found: Product not found");
    }

    #[tokio::test]
    async fn test_body_is_json_message() {
        let (status, body) = render(AppError::NotFound("API route not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "API route not found" }));
    }

    #[tokio::test]
    async fn test_order_errors() {
        let (status, body) =
            render(OrderError::InsufficientStock("Backpack".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Insufficient stock for Backpack");

        let (status, body) = render(OrderError::ProductNotFound(ProductId::new(42)).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Product 42 not found");

        let (status, body) = render(OrderError::TotalOutOfRange.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Order total is too large");

        let (status, _) = render(
            OrderError::Catalog(CatalogError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
                .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_auth_errors() {
        let (status, body) = render(AuthError::UserAlreadyExists.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email already in use");

        let (status, body) = render(AuthError::InvalidToken.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let (status, body) = render(
            RepositoryError::DataCorruption {
                collection: Collection::Orders,
                message: "disk on fire".into(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");

        let (status, body) = render(
            CatalogError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR).into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "Product catalog is unavailable");
    }

    #[tokio::test]
    async fn test_forbidden() {
        let (status, _) = render(AppError::Forbidden("Admin access required".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
