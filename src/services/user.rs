//! Users: generic CRUD plus registration and login.

use crate::auth::{dummy_hash, verify_password, TokenIssuer};
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::models::User;
use crate::repository::UserDirectory;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Login request body.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Registration response body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Registered {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub status: String,
}

impl From<User> for Registered {
    fn from(user: User) -> Self {
        Registered {
            id: user.id,
            username: user.username,
            email: user.email,
            status: user.status,
        }
    }
}

/// Login response body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Service layer for users.
///
/// Get, list, update, delete and restore go straight to the dispatcher;
/// there is no plain create, registration takes its place.
#[derive(Clone)]
pub struct UserService {
    dispatcher: Dispatcher<User>,
    directory: Arc<dyn UserDirectory>,
    tokens: TokenIssuer,
    timeout: Duration,
}

impl UserService {
    pub fn new(
        dispatcher: Dispatcher<User>,
        directory: Arc<dyn UserDirectory>,
        tokens: TokenIssuer,
    ) -> Self {
        UserService {
            dispatcher,
            directory,
            tokens,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Upper bound for the credential lookup.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher<User> {
        &self.dispatcher
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create an account. Username, password and email must be non-empty.
    pub async fn register(&self, payload: Value) -> Result<Registered> {
        let user = self.dispatcher.create(payload).await?;
        log::info!("[Service] Registered user {} ({})", user.id, user.username);
        Ok(user.into())
    }

    /// Check credentials against a live account and issue a bearer token.
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse> {
        let lookup = self.directory.find_by_username(&credentials.username);
        let found = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| Error::Timeout(format!("users store call exceeded {:?}", self.timeout)))??;

        let Some(user) = found else {
            // Same Argon2 cost as a wrong password.
            let _ = verify_password(&credentials.password, dummy_hash());
            log::info!("[Service] Login failed for unknown user");
            return Err(Error::Unauthorized("invalid credentials".to_string()));
        };

        if let Err(e) = verify_password(&credentials.password, &user.password) {
            log::info!("[Service] Login failed for user {}", user.id);
            return Err(e);
        }

        let token = self.tokens.issue(&user)?;
        log::info!("[Service] User {} logged in", user.id);
        Ok(TokenResponse { token })
    }
}
