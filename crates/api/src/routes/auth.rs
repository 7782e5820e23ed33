//! Registration and login handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use kranes_core::{Email, PublicUser};

use crate::error::Result;
use crate::middleware::{RequireAuth, ValidJson, Validate, validate::min_chars};
use crate::services::auth::AuthSession;
use crate::state::AppState;

/// Registration form.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Validate for RegisterRequest {
    const REJECTION: &'static str = "Invalid registration payload";

    fn is_valid(&self) -> bool {
        Email::parse(&self.email).is_ok()
            && min_chars(&self.password, 8)
            && min_chars(&self.name, 2)
    }
}

/// Login form.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    const REJECTION: &'static str = "Invalid login payload";

    fn is_valid(&self) -> bool {
        Email::parse(&self.email).is_ok() && !self.password.is_empty()
    }
}

/// Create a customer account.
///
/// POST /api/auth/register
///
/// # Errors
///
/// Returns 409 if the email is already registered.
pub async fn register(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthSession>)> {
    let session = state
        .auth()
        .register(&form.email, &form.password, &form.name)
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Exchange credentials for a token.
///
/// POST /api/auth/login
///
/// # Errors
///
/// Returns 401 for an unknown email or wrong password.
pub async fn login(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<LoginRequest>,
) -> Result<Json<AuthSession>> {
    let session = state
        .auth()
        .login(&form.email, &form.password)
        .await?;

    Ok(Json(session))
}

/// The signed-in user.
///
/// GET /api/auth/me
pub async fn me(RequireAuth(user): RequireAuth) -> Json<PublicUser> {
    Json(user.public())
}
