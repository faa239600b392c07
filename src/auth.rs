use std::collections::HashMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const DEMO_USER_ID: &str = "demo-user-id";
pub const DEMO_EMAIL: &str = "demo@example.com";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Any credentials are accepted; anonymous requests act as the demo user.
    #[default]
    Demo,
    /// Requires a real identity backend, none is wired up.
    Real,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    pub user: User,
    pub token: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("authentication backend is not configured")]
    Unavailable,
    #[error("not signed in")]
    Unauthenticated,
}

/// Per-server auth state. Lives in the server state, never in a global.
pub struct AuthService {
    mode: AuthMode,
    tokens: RwLock<HashMap<String, User>>,
}

impl AuthService {
    pub fn new(mode: AuthMode) -> Self {
        Self { mode, tokens: RwLock::new(HashMap::new()) }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub async fn sign_in(&self, email: &str, _password: &str) -> Result<SignedIn, AuthError> {
        match self.mode {
            AuthMode::Real => Err(AuthError::Unavailable),
            AuthMode::Demo => {
                let email = if email.trim().is_empty() { DEMO_EMAIL } else { email.trim() };
                let user = User { id: DEMO_USER_ID.into(), email: email.into() };
                let token = Uuid::new_v4().to_string();
                self.tokens.write().await.insert(token.clone(), user.clone());
                tracing::info!(email = %user.email, "demo sign-in");
                Ok(SignedIn { user, token })
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        self.sign_in(email, password).await
    }

    /// Returns whether the token was known.
    pub async fn sign_out(&self, token: &str) -> bool {
        self.tokens.write().await.remove(token).is_some()
    }

    /// Looks up the bearer token; in demo mode a missing token is the demo user.
    pub async fn current_user(&self, token: Option<&str>) -> Result<User, AuthError> {
        if let Some(token) = token {
            if let Some(user) = self.tokens.read().await.get(token) {
                return Ok(user.clone());
            }
            return Err(AuthError::Unauthenticated);
        }
        match self.mode {
            AuthMode::Demo => Ok(User { id: DEMO_USER_ID.into(), email: DEMO_EMAIL.into() }),
            AuthMode::Real => Err(AuthError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_sign_in_session_sign_out() {
        let auth = AuthService::new(AuthMode::Demo);
        let signed = auth.sign_in("ada@example.com", "whatever").await.unwrap();
        assert_eq!(signed.user.id, DEMO_USER_ID);
        assert_eq!(auth.current_user(Some(&signed.token)).await.unwrap().email, "ada@example.com");
        assert!(auth.sign_out(&signed.token).await);
        assert_eq!(auth.current_user(Some(&signed.token)).await, Err(AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn demo_mode_auto_logs_in_anonymous_requests() {
        let auth = AuthService::new(AuthMode::Demo);
        let user = auth.current_user(None).await.unwrap();
        assert_eq!(user.email, DEMO_EMAIL);
        let signed = auth.sign_up("", "").await.unwrap();
        assert_eq!(signed.user.email, DEMO_EMAIL);
    }

    #[tokio::test]
    async fn real_mode_rejects_everything() {
        let auth = AuthService::new(AuthMode::Real);
        assert_eq!(auth.sign_in("a@b.c", "pw").await.unwrap_err(), AuthError::Unavailable);
        assert_eq!(auth.current_user(None).await, Err(AuthError::Unauthenticated));
    }
}
