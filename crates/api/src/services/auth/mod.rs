//! Accounts and sessions.
//!
//! Customers register and sign in with an email and password. Sessions are
//! stateless bearer tokens, so resolving one always re-reads the user file
//! to pick up role changes and deletions.

mod error;

pub use error::AuthError;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use kranes_core::{Email, PublicUser, Role, UserId, UserRecord};

use crate::db::Store;
use crate::services::tokens::TokenService;

/// Signed token and the public profile of its owner.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: PublicUser,
}

/// Registration, login and token resolution over the user records.
pub struct AuthService<'a> {
    store: &'a Store,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store, tokens: &'a TokenService) -> Self {
        Self { store, tokens }
    }

    /// Open a customer account and sign it in.
    ///
    /// # Errors
    ///
    /// Fails like [`create_account`].
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthSession, AuthError> {
        let customer = create_account(self.store, email, password, name, Role::Customer).await?;
        info!(user_id = %customer.id, "Customer registered");
        self.sign_in(&customer)
    }

    /// Exchange an email and password for a session.
    ///
    /// # Errors
    ///
    /// An unknown email and a wrong password both give
    /// `AuthError::InvalidCredentials`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let users = self.store.records().users().await?;
        let Some(user) = users.iter().find(|user| user.email.matches(email)) else {
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        self.sign_in(user)
    }

    /// Resolve a bearer token to the stored user it names.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidToken` for a token that fails verification and
    /// `AuthError::UserNotFound` once its user is gone.
    pub async fn authenticate(&self, token: &str) -> Result<UserRecord, AuthError> {
        let claims = self.tokens.verify(token)?;

        self.store
            .records()
            .users()
            .await?
            .into_iter()
            .find(|user| user.id == claims.user_id)
            .ok_or(AuthError::UserNotFound)
    }

    /// Create the configured admin unless some admin account exists already.
    ///
    /// # Errors
    ///
    /// Fails like [`create_account`], e.g. when a customer holds the email.
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        let has_admin = self
            .store
            .records()
            .users()
            .await?
            .iter()
            .any(UserRecord::is_admin);
        if has_admin {
            return Ok(None);
        }

        let admin = create_account(self.store, email, password, name, Role::Admin).await?;
        info!(email = %admin.email, "Bootstrap admin created");
        Ok(Some(admin))
    }

    fn sign_in(&self, user: &UserRecord) -> Result<AuthSession, AuthError> {
        let token = self.tokens.issue(user)?;
        Ok(AuthSession {
            token,
            user: user.public(),
        })
    }
}

/// Store a new account with an Argon2id password hash.
///
/// The CLI calls this directly since it has no token signer.
///
/// # Errors
///
/// - `AuthError::InvalidEmail` for a malformed address
/// - `AuthError::WeakPassword` below [`password::MIN_LENGTH`] characters
/// - `AuthError::UserAlreadyExists` when the email is taken in any case
pub async fn create_account(
    store: &Store,
    email: &str,
    password: &str,
    name: &str,
    role: Role,
) -> Result<UserRecord, AuthError> {
    let email = Email::parse(email)?;
    password::check_strength(password)?;
    let password_hash = password::hash(password)?;

    let _guard = store.lock().await;
    let mut users = store.records().users().await?;
    if users.iter().any(|existing| existing.email.matches(email.as_str())) {
        return Err(AuthError::UserAlreadyExists);
    }

    let account = UserRecord {
        id: UserId::generate(),
        email,
        name: name.to_owned(),
        role,
        password_hash,
        created_at: Utc::now(),
        addresses: Vec::new(),
        cards: Vec::new(),
    };
    users.push(account.clone());
    store.records().save_users(&users).await?;

    Ok(account)
}

pub mod password {
    use argon2::Argon2;
    use argon2::password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    };

    use super::AuthError;

    pub const MIN_LENGTH: usize = 8;

    pub(super) fn check_strength(password: &str) -> Result<(), AuthError> {
        let length = password.chars().count();
        if length < MIN_LENGTH {
            return Err(AuthError::WeakPassword(format!(
                "needs {MIN_LENGTH} or more characters, got {length}"
            )));
        }
        Ok(())
    }

    /// PHC string for `password` under a fresh random salt.
    pub(super) fn hash(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|phc| phc.to_string())
            .map_err(|_| AuthError::PasswordHash)
    }

    /// False for a mismatch and for a stored hash that does not parse.
    pub(super) fn verify(password: &str, stored: &str) -> bool {
        PasswordHash::new(stored).is_ok_and(|phc| {
            Argon2::default()
                .verify_password(password.as_bytes(), &phc)
                .is_ok()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn tokens() -> TokenService {
        TokenService::new(
            &SecretString::from("q8Z!r2Lx@9vT#m4Kp$7wN&e1Yb^c6Hs"),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::json(dir.path());
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        let registered = auth
            .register("Shopper@Example.com", "hunter22!", "Sam")
            .await
            .unwrap();
        assert_eq!(registered.user.role, Role::Customer);

        let session = auth.login("shopper@example.com", "hunter22!").await.unwrap();
        assert_eq!(session.user.id, registered.user.id);

        let user = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(user.name, "Sam");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::json(dir.path());
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        auth.register("dup@example.com", "password1", "First")
            .await
            .unwrap();
        let err = auth
            .register("DUP@example.com", "password2", "Second")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::json(dir.path());
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        auth.register("a@example.com", "password1", "Al").await.unwrap();

        let wrong_password = auth.login("a@example.com", "password2").await.unwrap_err();
        let unknown_email = auth.login("b@example.com", "password1").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::json(dir.path());
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        let first = auth
            .bootstrap_admin("admin@kranes.market", "Admin123!", "Store Owner")
            .await
            .unwrap();
        let second = auth
            .bootstrap_admin("other@kranes.market", "Admin123!", "Other")
            .await
            .unwrap();

        assert!(first.is_some_and(|admin| admin.is_admin()));
        assert!(second.is_none());
        assert_eq!(store.records().users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_token_for_deleted_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::json(dir.path());
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        let session = auth.register("gone@example.com", "password1", "Gone").await.unwrap();
        store.records().save_users(&[]).await.unwrap();

        let err = auth.authenticate(&session.token).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[test]
    fn test_password_rules() {
        assert!(matches!(
            password::check_strength("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(password::check_strength("longenough").is_ok());

        let stored = password::hash("longenough").unwrap();
        assert!(password::verify("longenough", &stored));
        assert!(!password::verify("longenougH", &stored));
        assert!(!password::verify("longenough", "not-a-phc-string"));
    }
}
