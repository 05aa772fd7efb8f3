//! Credential service: registration, login and token resolution.

pub mod password;
pub mod token;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::storage::models::UserRecord;
use crate::storage::Repository;
pub use token::{Claims, TokenCodec};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Username '{0}' is already registered")]
    UsernameTaken(String),
    #[error("Email '{0}' is already registered")]
    EmailTaken(String),
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Could not validate credentials")]
    InvalidToken,
    #[error("Failed to create user: {0}")]
    UserCreate(String),
    #[error("Failed to retrieve user: {0}")]
    UserRetrieve(String),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Token error: {0}")]
    Token(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn Repository>,
    tokens: TokenCodec,
}

impl AuthService {
    pub fn new(repo: Arc<dyn Repository>, config: &AuthConfig) -> Self {
        Self {
            repo,
            tokens: TokenCodec::new(config),
        }
    }

    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, AuthError> {
        let username = username.trim();
        let email = email.trim().to_lowercase();
        if username.is_empty() {
            return Err(AuthError::Validation("Username must not be empty".to_string()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Validation("A valid email is required".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("Password must not be empty".to_string()));
        }

        if self
            .repo
            .get_user_by_username(username)
            .map_err(|e| AuthError::UserRetrieve(e.to_string()))?
            .is_some()
        {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }
        if self
            .repo
            .get_user_by_email(&email)
            .map_err(|e| AuthError::UserRetrieve(e.to_string()))?
            .is_some()
        {
            return Err(AuthError::EmailTaken(email));
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email,
            password_hash: password::hash_password(password)?,
            created_at: Utc::now(),
        };

        self.repo
            .create_user(&user)
            .map_err(|e| AuthError::UserCreate(e.to_string()))?;

        tracing::info!(user_id = %user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    /// Exchange a username and password for an access token.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<AccessToken, AuthError> {
        let user = self
            .repo
            .get_user_by_username(username.trim())
            .map_err(|e| AuthError::UserRetrieve(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(AccessToken {
            access_token: self.tokens.issue(user.id)?,
            token_type: "bearer".to_string(),
        })
    }

    /// Resolve a bearer token to a live user.
    pub fn current_user(&self, token: &str) -> Result<UserRecord, AuthError> {
        let claims = self.tokens.verify(token)?;
        self.repo
            .get_user(claims.sub)
            .map_err(|e| AuthError::UserRetrieve(e.to_string()))?
            .ok_or(AuthError::InvalidToken)
    }
}
