//! Clients for the hosted backend: identity, settings and paper storage

pub mod identity;
pub mod memory;
pub mod settings;
pub mod supabase;

use std::future::Future;

use thiserror::Error;

use identity::{AuthData, IdentityProvider, ProfilePatch, Session, User};
use memory::InMemoryBackend;
use settings::{SettingsStore, UserSettings, UserSettingsPatch};
use supabase::SupabaseClient;

/// Failures reported by a backend collaborator
#[derive(Debug, Error)]
pub enum BackendError {
    /// Rejected credentials or input, with the provider's message
    #[error("{0}")]
    Auth(String),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("no settings found for user {0}")]
    SettingsNotFound(String),
    #[error("unknown user {0}")]
    UnknownUser(String),
    #[error("request failed with status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

impl BackendError {
    /// Whether the failure means the user has to sign in again
    pub fn is_auth(&self) -> bool {
        matches!(self, BackendError::Auth(_) | BackendError::NotAuthenticated)
    }
}

/// Persistence for paper content
pub trait DocumentSink {
    fn save_document(
        &self,
        paper_id: &str,
        title: &str,
        content: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Backend selected at startup
#[derive(Debug, Clone)]
pub enum Backend {
    Supabase(SupabaseClient),
    Memory(InMemoryBackend),
}

impl Backend {
    /// Short description for the status bar
    pub fn describe(&self) -> String {
        match self {
            Backend::Supabase(client) => format!("Connected to {}", client.base_url()),
            Backend::Memory(_) => "Offline (local session)".to_string(),
        }
    }
}

impl IdentityProvider for Backend {
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<AuthData, BackendError> {
        match self {
            Backend::Supabase(client) => client.sign_up(email, password, display_name).await,
            Backend::Memory(memory) => memory.sign_up(email, password, display_name).await,
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthData, BackendError> {
        match self {
            Backend::Supabase(client) => client.sign_in(email, password).await,
            Backend::Memory(memory) => memory.sign_in(email, password).await,
        }
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        match self {
            Backend::Supabase(client) => client.sign_out().await,
            Backend::Memory(memory) => memory.sign_out().await,
        }
    }

    async fn reset_password(&self, email: &str) -> Result<(), BackendError> {
        match self {
            Backend::Supabase(client) => client.reset_password(email).await,
            Backend::Memory(memory) => memory.reset_password(email).await,
        }
    }

    async fn update_password(&self, password: &str) -> Result<(), BackendError> {
        match self {
            Backend::Supabase(client) => client.update_password(password).await,
            Backend::Memory(memory) => memory.update_password(password).await,
        }
    }

    async fn update_profile(&self, patch: &ProfilePatch) -> Result<(), BackendError> {
        match self {
            Backend::Supabase(client) => client.update_profile(patch).await,
            Backend::Memory(memory) => memory.update_profile(patch).await,
        }
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        match self {
            Backend::Supabase(client) => client.current_session().await,
            Backend::Memory(memory) => memory.current_session().await,
        }
    }

    async fn current_user(&self) -> Result<Option<User>, BackendError> {
        match self {
            Backend::Supabase(client) => client.current_user().await,
            Backend::Memory(memory) => memory.current_user().await,
        }
    }
}

impl SettingsStore for Backend {
    async fn get_user_settings(&self, user_id: &str) -> Result<UserSettings, BackendError> {
        match self {
            Backend::Supabase(client) => client.get_user_settings(user_id).await,
            Backend::Memory(memory) => memory.get_user_settings(user_id).await,
        }
    }

    async fn update_user_settings(
        &self,
        user_id: &str,
        patch: &UserSettingsPatch,
    ) -> Result<UserSettings, BackendError> {
        match self {
            Backend::Supabase(client) => client.update_user_settings(user_id, patch).await,
            Backend::Memory(memory) => memory.update_user_settings(user_id, patch).await,
        }
    }
}

impl DocumentSink for Backend {
    async fn save_document(&self, paper_id: &str, title: &str, content: &str) -> Result<(), BackendError> {
        match self {
            Backend::Supabase(client) => client.save_document(paper_id, title, content).await,
            Backend::Memory(memory) => memory.save_document(paper_id, title, content).await,
        }
    }
}
