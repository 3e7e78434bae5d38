//! Identity records and the sign-in gate

use std::future::Future;

use serde::{Deserialize, Serialize};

use super::BackendError;

/// Read-only projection of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl User {
    /// Name shown in the shell
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Tokens issued by a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
}

/// Result of sign-up or sign-in.
///
/// `session` is `None` when the provider requires email confirmation first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthData {
    pub user: User,
    pub session: Option<Session>,
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Account operations delegated to the hosted auth provider.
///
/// Errors are returned as the provider reported them; nothing is retried.
pub trait IdentityProvider {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> impl Future<Output = Result<AuthData, BackendError>> + Send;

    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = Result<AuthData, BackendError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn reset_password(&self, email: &str) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn update_password(&self, password: &str) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn update_profile(&self, patch: &ProfilePatch) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Current session, `None` when signed out
    fn current_session(&self) -> impl Future<Output = Result<Option<Session>, BackendError>> + Send;

    /// Current user, `None` when signed out. Only transport failures are errors.
    fn current_user(&self) -> impl Future<Output = Result<Option<User>, BackendError>> + Send;
}

/// Outcome of [`require_auth`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted(User),
    /// Not signed in; the caller routes to the sign-in view
    SignInRequired,
}

/// Resolve the signed-in user or ask for a redirect to sign-in
pub async fn require_auth<I: IdentityProvider>(identity: &I) -> Result<Access, BackendError> {
    Ok(match identity.current_user().await? {
        Some(user) => Access::Granted(user),
        None => Access::SignInRequired,
    })
}
