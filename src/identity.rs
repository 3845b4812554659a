//! Identity provider boundary.
//!
//! Authentication is external to the workflow core: the core only ever
//! consumes a stable `user_id`. Role and display name are not identity
//! concerns — they live in the profile store and are re-resolved at
//! every authorization check, never carried in the session.

use std::collections::HashMap;

use pbkdf2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use pbkdf2::Pbkdf2;
use thiserror::Error;
use uuid::Uuid;

/// Errors from identity operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email already registered")]
    EmailTaken,
    #[error("credential hashing failed: {0}")]
    Hash(String),
}

/// An authenticated session subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
}

/// External identity boundary: authenticates a caller and yields a
/// stable user id. Implementations hold the session; the workflow core
/// never sees credentials.
pub trait IdentityProvider {
    /// The current session subject, or `None` when unauthenticated.
    fn current_user(&self) -> Option<AuthenticatedUser>;

    fn sign_in(&mut self, email: &str, password: &str) -> Result<AuthenticatedUser, AuthError>;

    fn sign_out(&mut self);
}

struct Credential {
    user_id: String,
    password_hash: String,
}

/// In-process identity provider with PBKDF2-hashed credentials.
#[derive(Default)]
pub struct LocalIdentityProvider {
    credentials: HashMap<String, Credential>,
    session: Option<AuthenticatedUser>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new account and return its stable user id.
    pub fn register(&mut self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = email.trim().to_lowercase();
        if self.credentials.contains_key(&email) {
            return Err(AuthError::EmailTaken);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Pbkdf2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .to_string();

        let user_id = Uuid::new_v4().to_string();
        self.credentials.insert(
            email,
            Credential {
                user_id: user_id.clone(),
                password_hash,
            },
        );
        Ok(user_id)
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn current_user(&self) -> Option<AuthenticatedUser> {
        self.session.clone()
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        let email = email.trim().to_lowercase();
        let cred = self
            .credentials
            .get(&email)
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed =
            PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::Hash(e.to_string()))?;
        Pbkdf2
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let user = AuthenticatedUser {
            user_id: cred.user_id.clone(),
            email,
        };
        tracing::info!(user_id = %user.user_id, "signed in");
        self.session = Some(user.clone());
        Ok(user)
    }

    fn sign_out(&mut self) {
        if let Some(user) = self.session.take() {
            tracing::info!(user_id = %user.user_id, "signed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_sign_in() {
        let mut identity = LocalIdentityProvider::new();
        let user_id = identity.register("grey@clinic.test", "correct horse").unwrap();

        let user = identity.sign_in("grey@clinic.test", "correct horse").unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(identity.current_user(), Some(user));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let mut identity = LocalIdentityProvider::new();
        identity.register("grey@clinic.test", "correct horse").unwrap();

        let result = identity.sign_in("grey@clinic.test", "battery staple");
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(identity.current_user().is_none());
    }

    #[test]
    fn unknown_email_is_rejected() {
        let mut identity = LocalIdentityProvider::new();
        let result = identity.sign_in("nobody@clinic.test", "whatever");
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn sign_out_clears_session() {
        let mut identity = LocalIdentityProvider::new();
        identity.register("grey@clinic.test", "correct horse").unwrap();
        identity.sign_in("grey@clinic.test", "correct horse").unwrap();

        identity.sign_out();
        assert!(identity.current_user().is_none());
    }

    #[test]
    fn email_is_case_insensitive() {
        let mut identity = LocalIdentityProvider::new();
        identity.register("Grey@Clinic.Test", "correct horse").unwrap();

        assert!(identity.sign_in("grey@clinic.test", "correct horse").is_ok());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut identity = LocalIdentityProvider::new();
        identity.register("grey@clinic.test", "one").unwrap();

        let result = identity.register("grey@clinic.test", "two");
        assert!(matches!(result, Err(AuthError::EmailTaken)));
    }
}
