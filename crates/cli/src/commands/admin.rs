//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! kranes admin create -e owner@kranes.market -n "Store Owner" -p 'S3cure-pass'
//! ```
//!
//! # Environment Variables
//!
//! - `DATA_DIR` - Data directory (default `data`)
//! - `ADMIN_PASSWORD` - Password, if `-p` is not given

use std::path::Path;

use kranes_api::db::Store;
use kranes_api::services::auth::{AuthError, create_account};
use kranes_core::{Role, UserId};
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// User already exists.
    #[error("A user already exists with email: {0}")]
    UserExists(String),

    /// Invalid email or password.
    #[error("{0}")]
    InvalidInput(AuthError),

    /// Account could not be stored.
    #[error("Failed to create admin: {0}")]
    Auth(AuthError),
}

impl From<AuthError> for AdminError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => Self::InvalidInput(err),
            other => Self::Auth(other),
        }
    }
}

/// Create a new admin user.
///
/// # Arguments
///
/// * `data_dir` - Data directory holding `users.json`
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `password` - Admin's password
///
/// # Returns
///
/// The ID of the created admin user.
pub async fn create_user(
    data_dir: &Path,
    email: &str,
    name: &str,
    password: &str,
) -> Result<UserId, AdminError> {
    let store = Store::json(data_dir);

    tracing::info!("Creating admin user: {}", email);

    let user = create_account(&store, email, password, name, Role::Admin)
        .await
        .map_err(|err| match err {
            AuthError::UserAlreadyExists => AdminError::UserExists(email.to_owned()),
            other => other.into(),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_admin() {
        let dir = tempfile::tempdir().unwrap();

        let id = create_user(dir.path(), "owner@kranes.market", "Owner", "S3cure-pass")
            .await
            .unwrap();

        let users = Store::json(dir.path()).records().users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, id);
        assert_eq!(users[0].role, Role::Admin);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let dir = tempfile::tempdir().unwrap();
        create_user(dir.path(), "owner@kranes.market", "Owner", "S3cure-pass")
            .await
            .unwrap();

        let err = create_user(dir.path(), "OWNER@kranes.market", "Other", "S3cure-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::UserExists(_)));
    }

    #[tokio::test]
    async fn test_short_password() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_user(dir.path(), "owner@kranes.market", "Owner", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::InvalidInput(_)));
    }
}
