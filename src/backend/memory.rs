//! In-process backend used offline and in tests
//!
//! Mirrors the hosted provider's observable behavior: accounts, a single
//! active session, one settings row per account, and paper upserts.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use super::identity::{AuthData, IdentityProvider, ProfilePatch, Session, User};
use super::settings::{SettingsStore, UserSettings, UserSettingsPatch};
use super::{BackendError, DocumentSink};

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    user: User,
    password: String,
}

/// A paper as last persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPaper {
    pub id: String,
    pub title: String,
    pub content: String,
    pub owner_id: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    /// Accounts keyed by lowercase email
    accounts: HashMap<String, Account>,
    settings: HashMap<String, UserSettings>,
    papers: HashMap<String, StoredPaper>,
    session: Option<Session>,
    password_resets: Vec<String>,
}

/// HashMap-backed identity, settings and paper store. Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<RwLock<MemoryState>>,
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend").finish_non_exhaustive()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, BackendError> {
        self.state
            .read()
            .map_err(|_| BackendError::Storage("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, BackendError> {
        self.state
            .write()
            .map_err(|_| BackendError::Storage("lock poisoned".into()))
    }

    fn issue_session(state: &mut MemoryState, user: &User) -> Session {
        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Some(Uuid::new_v4().to_string()),
            expires_in: Some(3600),
            user: user.clone(),
        };
        state.session = Some(session.clone());
        session
    }

    fn signed_in_user(state: &MemoryState) -> Result<User, BackendError> {
        state
            .session
            .as_ref()
            .map(|session| session.user.clone())
            .ok_or(BackendError::NotAuthenticated)
    }

    /// Last persisted version of a paper
    #[cfg(test)]
    pub fn paper(&self, id: &str) -> Option<StoredPaper> {
        self.read().ok()?.papers.get(id).cloned()
    }

    /// Emails that requested a password reset, oldest first
    #[cfg(test)]
    pub fn password_resets(&self) -> Vec<String> {
        self.read()
            .map(|state| state.password_resets.clone())
            .unwrap_or_default()
    }
}

impl IdentityProvider for InMemoryBackend {
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<AuthData, BackendError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(BackendError::Auth("Unable to validate email address: invalid format".into()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(BackendError::Auth(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }

        let mut state = self.write()?;
        if state.accounts.contains_key(&email) {
            return Err(BackendError::Auth("User already registered".into()));
        }

        let display_name = display_name.trim();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            display_name: (!display_name.is_empty()).then(|| display_name.to_string()),
            avatar_url: None,
        };
        state.accounts.insert(
            email,
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        state
            .settings
            .insert(user.id.clone(), UserSettings::new(user.id.clone()));
        let session = Self::issue_session(&mut state, &user);

        tracing::info!("Registered local account {}", user.id);
        Ok(AuthData {
            user,
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthData, BackendError> {
        let email = email.trim().to_lowercase();
        let mut state = self.write()?;
        let user = match state.accounts.get(&email) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(BackendError::Auth("Invalid login credentials".into())),
        };
        let session = Self::issue_session(&mut state, &user);
        Ok(AuthData {
            user,
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.write()?.session = None;
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), BackendError> {
        // Unknown addresses succeed too, so the response does not reveal accounts
        self.write()?.password_resets.push(email.trim().to_lowercase());
        Ok(())
    }

    async fn update_password(&self, password: &str) -> Result<(), BackendError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(BackendError::Auth(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }
        let mut state = self.write()?;
        let user = Self::signed_in_user(&state)?;
        let account = state
            .accounts
            .get_mut(&user.email)
            .ok_or_else(|| BackendError::UnknownUser(user.id.clone()))?;
        account.password = password.to_string();
        Ok(())
    }

    async fn update_profile(&self, patch: &ProfilePatch) -> Result<(), BackendError> {
        let mut state = self.write()?;
        let user = Self::signed_in_user(&state)?;
        let account = state
            .accounts
            .get_mut(&user.email)
            .ok_or_else(|| BackendError::UnknownUser(user.id.clone()))?;

        if let Some(ref name) = patch.display_name {
            account.user.display_name = Some(name.clone());
        }
        if let Some(ref url) = patch.avatar_url {
            account.user.avatar_url = Some(url.clone());
        }
        let updated = account.user.clone();
        if let Some(ref mut session) = state.session {
            session.user = updated;
        }
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(self.read()?.session.clone())
    }

    async fn current_user(&self) -> Result<Option<User>, BackendError> {
        Ok(self.read()?.session.as_ref().map(|session| session.user.clone()))
    }
}

impl SettingsStore for InMemoryBackend {
    async fn get_user_settings(&self, user_id: &str) -> Result<UserSettings, BackendError> {
        self.read()?
            .settings
            .get(user_id)
            .cloned()
            .ok_or_else(|| BackendError::SettingsNotFound(user_id.to_string()))
    }

    async fn update_user_settings(
        &self,
        user_id: &str,
        patch: &UserSettingsPatch,
    ) -> Result<UserSettings, BackendError> {
        let mut state = self.write()?;
        let settings = state
            .settings
            .get_mut(user_id)
            .ok_or_else(|| BackendError::UnknownUser(user_id.to_string()))?;
        settings.apply(patch);
        Ok(settings.clone())
    }
}

impl DocumentSink for InMemoryBackend {
    async fn save_document(&self, paper_id: &str, title: &str, content: &str) -> Result<(), BackendError> {
        let mut state = self.write()?;
        let owner_id = state.session.as_ref().map(|session| session.user.id.clone());
        state.papers.insert(
            paper_id.to_string(),
            StoredPaper {
                id: paper_id.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                owner_id,
            },
        );
        tracing::debug!("Stored paper {} ({} bytes)", paper_id, content.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_sign_out_sign_in() {
        let backend = InMemoryBackend::new();
        let data = backend
            .sign_up("Grace@Example.org", "compiler", "Grace Hopper")
            .await
            .unwrap();
        assert_eq!(data.user.email, "grace@example.org");
        assert_eq!(data.user.display_name.as_deref(), Some("Grace Hopper"));
        assert!(data.session.is_some());

        backend.sign_out().await.unwrap();
        assert_eq!(backend.current_user().await.unwrap(), None);
        assert_eq!(backend.current_session().await.unwrap(), None);

        let data = backend.sign_in("grace@example.org", "compiler").await.unwrap();
        assert_eq!(backend.current_user().await.unwrap(), Some(data.user));
    }

    #[tokio::test]
    async fn test_auth_errors_are_reported_verbatim() {
        let backend = InMemoryBackend::new();
        backend.sign_up("a@b.org", "secret1", "").await.unwrap();

        let err = backend.sign_up("a@b.org", "secret1", "").await.unwrap_err();
        assert_eq!(err.to_string(), "User already registered");

        let err = backend.sign_in("a@b.org", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(err.is_auth());

        let err = backend.sign_up("c@d.org", "123", "").await.unwrap_err();
        assert!(matches!(err, BackendError::Auth(_)));
    }

    #[tokio::test]
    async fn test_profile_and_password_require_session() {
        let backend = InMemoryBackend::new();
        let patch = ProfilePatch {
            display_name: Some("New".into()),
            avatar_url: None,
        };
        assert!(matches!(
            backend.update_profile(&patch).await,
            Err(BackendError::NotAuthenticated)
        ));
        assert!(matches!(
            backend.update_password("longenough").await,
            Err(BackendError::NotAuthenticated)
        ));

        backend.sign_up("a@b.org", "secret1", "Old").await.unwrap();
        backend.update_profile(&patch).await.unwrap();
        let user = backend.current_user().await.unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("New"));

        backend.update_password("secret2").await.unwrap();
        backend.sign_out().await.unwrap();
        assert!(backend.sign_in("a@b.org", "secret1").await.is_err());
        assert!(backend.sign_in("a@b.org", "secret2").await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_password_does_not_reveal_accounts() {
        let backend = InMemoryBackend::new();
        backend.reset_password("nobody@example.org").await.unwrap();
        assert_eq!(backend.password_resets(), vec!["nobody@example.org".to_string()]);
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let backend = InMemoryBackend::new();
        let user = backend.sign_up("a@b.org", "secret1", "").await.unwrap().user;

        let settings = backend.get_user_settings(&user.id).await.unwrap();
        assert_eq!(settings, UserSettings::new(user.id.clone()));

        let merged = backend
            .update_user_settings(
                &user.id,
                &UserSettingsPatch {
                    word_wrap: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!merged.word_wrap);
        assert_eq!(merged.editor_font_size, settings.editor_font_size);
    }

    #[tokio::test]
    async fn test_settings_for_unknown_user() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.get_user_settings("ghost").await,
            Err(BackendError::SettingsNotFound(id)) if id == "ghost"
        ));
        assert!(matches!(
            backend.update_user_settings("ghost", &UserSettingsPatch::default()).await,
            Err(BackendError::UnknownUser(_))
        ));
    }

    #[tokio::test]
    async fn test_save_document_upserts() {
        let backend = InMemoryBackend::new();
        backend.save_document("p1", "Draft", "v1").await.unwrap();
        backend.save_document("p1", "Draft", "v2").await.unwrap();

        let paper = backend.paper("p1").unwrap();
        assert_eq!(paper.content, "v2");
        assert_eq!(paper.owner_id, None);
    }
}
