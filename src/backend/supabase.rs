//! HTTP client for a Supabase project
//!
//! Auth calls go to the GoTrue endpoints under `/auth/v1`, table access to
//! PostgREST under `/rest/v1`. The client keeps the session returned by
//! sign-in and sends its access token on every request.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::identity::{AuthData, IdentityProvider, ProfilePatch, Session, User};
use super::settings::{SettingsStore, UserSettings, UserSettingsPatch};
use super::{BackendError, DocumentSink};
use crate::core::config::BackendConfig;

const USERS_TABLE: &str = "users";
const SETTINGS_TABLE: &str = "user_settings";
const PAPERS_TABLE: &str = "papers";

/// User object as returned by the auth endpoints
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl From<AuthUser> for User {
    fn from(user: AuthUser) -> Self {
        let metadata = |key: &str| {
            user.user_metadata
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        User {
            display_name: metadata("display_name"),
            avatar_url: metadata("avatar_url"),
            email: user.email.clone().unwrap_or_default(),
            id: user.id,
        }
    }
}

/// Token grant response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            user: token.user.into(),
        }
    }
}

#[derive(Serialize)]
struct PaperRow<'a> {
    id: &'a str,
    title: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_id: Option<&'a str>,
}

/// Supabase auth and data client
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    redirect_url: Option<String>,
    session: Arc<RwLock<Option<Session>>>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a client for the project at `base_url`
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            redirect_url: None,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Build a client from configuration; `None` when no project is configured
    pub fn from_config(config: &BackendConfig) -> Option<Self> {
        let url = config.url.as_deref().filter(|url| !url.trim().is_empty())?;
        let mut client = Self::new(url, config.anon_key.clone().unwrap_or_default());
        client.redirect_url = config
            .redirect_url
            .as_deref()
            .map(|app| format!("{}/auth/reset-password", app.trim_end_matches('/')));
        Some(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    fn set_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn session_user(&self) -> Option<User> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.user.clone())
    }

    /// Request with the project key and the user's token (or the key) as bearer
    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let bearer = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn select_by<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Vec<T>, BackendError> {
        let response = self
            .request(reqwest::Method::GET, self.rest_url(table))
            .query(&[(column, format!("eq.{value}")), ("select", "*".to_string())])
            .send()
            .await?;
        Ok(check(response, Api::Rest).await?.json().await?)
    }

    async fn update_by<T: for<'de> Deserialize<'de>, B: Serialize + ?Sized>(
        &self,
        table: &str,
        column: &str,
        value: &str,
        body: &B,
    ) -> Result<Vec<T>, BackendError> {
        let response = self
            .request(reqwest::Method::PATCH, self.rest_url(table))
            .query(&[(column, format!("eq.{value}"))])
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        Ok(check(response, Api::Rest).await?.json().await?)
    }
}

/// Which API answered a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Api {
    /// GoTrue, where client errors mean rejected credentials or input
    Auth,
    /// PostgREST, where only a rejected token is an auth failure
    Rest,
}

/// Pass successful responses through and turn the rest into errors
async fn check(response: Response, api: Api) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    let auth_failure = match api {
        Api::Auth => matches!(
            status,
            StatusCode::BAD_REQUEST
                | StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::UNPROCESSABLE_ENTITY
        ),
        Api::Rest => status == StatusCode::UNAUTHORIZED,
    };
    if auth_failure {
        Err(BackendError::Auth(message))
    } else {
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull a human readable message out of a GoTrue or PostgREST error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

impl IdentityProvider for SupabaseClient {
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<AuthData, BackendError> {
        let response = self
            .request(reqwest::Method::POST, self.auth_url("signup"))
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "display_name": display_name },
            }))
            .send()
            .await?;
        let body: Value = check(response, Api::Auth).await?.json().await?;

        // With email confirmation enabled the provider returns a bare user
        let data = if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value::<TokenResponse>(body)
                .map_err(|e| BackendError::Storage(e.to_string()))?
                .into();
            self.set_session(Some(session.clone()));
            AuthData {
                user: session.user.clone(),
                session: Some(session),
            }
        } else {
            let user: AuthUser =
                serde_json::from_value(body).map_err(|e| BackendError::Storage(e.to_string()))?;
            AuthData {
                user: user.into(),
                session: None,
            }
        };

        tracing::info!("Signed up {}", data.user.id);
        Ok(data)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthData, BackendError> {
        let response = self
            .request(reqwest::Method::POST, self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = check(response, Api::Auth).await?.json().await?;
        let session = Session::from(token);
        self.set_session(Some(session.clone()));

        tracing::info!("Signed in {}", session.user.id);
        Ok(AuthData {
            user: session.user.clone(),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if self.access_token().is_none() {
            return Ok(());
        }
        let request = self.request(reqwest::Method::POST, self.auth_url("logout"));
        // The local session is gone whether or not the provider is reachable
        self.set_session(None);
        check(request.send().await?, Api::Auth).await?;
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), BackendError> {
        let mut request = self
            .request(reqwest::Method::POST, self.auth_url("recover"))
            .json(&json!({ "email": email }));
        if let Some(ref redirect) = self.redirect_url {
            request = request.query(&[("redirect_to", redirect)]);
        }
        check(request.send().await?, Api::Auth).await?;
        Ok(())
    }

    async fn update_password(&self, password: &str) -> Result<(), BackendError> {
        if self.access_token().is_none() {
            return Err(BackendError::NotAuthenticated);
        }
        let response = self
            .request(reqwest::Method::PUT, self.auth_url("user"))
            .json(&json!({ "password": password }))
            .send()
            .await?;
        check(response, Api::Auth).await?;
        Ok(())
    }

    async fn update_profile(&self, patch: &ProfilePatch) -> Result<(), BackendError> {
        let user = self.current_user().await?.ok_or(BackendError::NotAuthenticated)?;
        let rows: Vec<Value> = self.update_by(USERS_TABLE, "id", &user.id, patch).await?;
        if rows.is_empty() {
            return Err(BackendError::UnknownUser(user.id));
        }
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(self.session.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn current_user(&self) -> Result<Option<User>, BackendError> {
        if self.access_token().is_none() {
            return Ok(None);
        }

        let response = self
            .request(reqwest::Method::GET, self.auth_url("user"))
            .send()
            .await?;
        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            tracing::info!("Session rejected by the auth provider; signing out locally");
            self.set_session(None);
            return Ok(None);
        }
        let auth_user: AuthUser = check(response, Api::Auth).await?.json().await?;
        let fallback = User::from(auth_user);

        // Prefer the profile row; the auth record is enough when it is missing
        match self.select_by::<User>(USERS_TABLE, "id", &fallback.id).await {
            Ok(rows) => Ok(Some(rows.into_iter().next().unwrap_or(fallback))),
            Err(BackendError::Transport(e)) => Err(BackendError::Transport(e)),
            Err(e) => {
                tracing::warn!("Profile lookup failed for {}: {}", fallback.id, e);
                Ok(Some(fallback))
            }
        }
    }
}

impl SettingsStore for SupabaseClient {
    async fn get_user_settings(&self, user_id: &str) -> Result<UserSettings, BackendError> {
        self.select_by::<UserSettings>(SETTINGS_TABLE, "user_id", user_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::SettingsNotFound(user_id.to_string()))
    }

    async fn update_user_settings(
        &self,
        user_id: &str,
        patch: &UserSettingsPatch,
    ) -> Result<UserSettings, BackendError> {
        self.update_by::<UserSettings, _>(SETTINGS_TABLE, "user_id", user_id, patch)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::UnknownUser(user_id.to_string()))
    }
}

impl DocumentSink for SupabaseClient {
    async fn save_document(&self, paper_id: &str, title: &str, content: &str) -> Result<(), BackendError> {
        let owner = self.session_user().map(|user| user.id);
        let row = PaperRow {
            id: paper_id,
            title,
            content,
            owner_id: owner.as_deref(),
        };
        let response = self
            .request(reqwest::Method::POST, self.rest_url(PAPERS_TABLE))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row)
            .send()
            .await?;
        check(response, Api::Rest).await?;
        tracing::info!("Saved paper {}", paper_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::HashMap;

    const TOKEN: &str = "token-123";

    fn token_body() -> Value {
        json!({
            "access_token": TOKEN,
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {
                "id": "user-1",
                "email": "ada@example.org",
                "user_metadata": { "display_name": "Ada" }
            }
        })
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
    }

    fn settings_row(word_wrap: bool) -> Value {
        serde_json::to_value(UserSettings {
            word_wrap,
            ..UserSettings::new("user-1")
        })
        .unwrap()
    }

    fn fake_project() -> Router {
        Router::new()
            .route(
                "/auth/v1/token",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "right" {
                        (AxumStatus::OK, Json(token_body()))
                    } else {
                        (
                            AxumStatus::BAD_REQUEST,
                            Json(json!({
                                "error": "invalid_grant",
                                "error_description": "Invalid login credentials"
                            })),
                        )
                    }
                }),
            )
            .route(
                "/auth/v1/user",
                get(|headers: HeaderMap| async move {
                    if authorized(&headers) {
                        (AxumStatus::OK, Json(token_body()["user"].clone()))
                    } else {
                        (AxumStatus::UNAUTHORIZED, Json(json!({ "msg": "invalid JWT" })))
                    }
                }),
            )
            .route("/auth/v1/logout", post(|| async { AxumStatus::NO_CONTENT }))
            .route(
                "/rest/v1/users",
                get(|| async {
                    Json(json!([{
                        "id": "user-1",
                        "email": "ada@example.org",
                        "display_name": "Ada Lovelace",
                        "avatar_url": null
                    }]))
                }),
            )
            .route(
                "/rest/v1/user_settings",
                get(|Query(query): Query<HashMap<String, String>>| async move {
                    if query.get("user_id").map(String::as_str) == Some("eq.user-1") {
                        Json(json!([settings_row(true)]))
                    } else {
                        Json(json!([]))
                    }
                })
                .patch(
                    |Query(query): Query<HashMap<String, String>>, Json(patch): Json<Value>| async move {
                        if query.get("user_id").map(String::as_str) != Some("eq.user-1") {
                            return Json(json!([]));
                        }
                        let word_wrap = patch["word_wrap"].as_bool().unwrap_or(true);
                        Json(json!([settings_row(word_wrap)]))
                    },
                ),
            )
            .route(
                "/rest/v1/papers",
                post(|Json(row): Json<Value>| async move {
                    match row["title"].as_str() {
                        Some("Missing column") => (
                            AxumStatus::BAD_REQUEST,
                            Json(json!({
                                "code": "PGRST204",
                                "message": "Could not find the 'owner_id' column of 'papers' in the schema cache"
                            })),
                        ),
                        Some("Expired") => (
                            AxumStatus::UNAUTHORIZED,
                            Json(json!({ "code": "PGRST301", "message": "JWT expired" })),
                        ),
                        _ if row["id"].as_str().is_some() => (AxumStatus::CREATED, Json(Value::Null)),
                        _ => (AxumStatus::INTERNAL_SERVER_ERROR, Json(Value::Null)),
                    }
                }),
            )
    }

    async fn start_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, fake_project()).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_error_message_keys() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Bad"}"#).as_deref(),
            Some("Bad")
        );
        assert_eq!(error_message(r#"{"msg":"Nope"}"#).as_deref(), Some("Nope"));
        assert_eq!(error_message("not json"), None);
    }

    #[test]
    fn test_from_config_requires_url() {
        let mut config = BackendConfig::default();
        assert!(SupabaseClient::from_config(&config).is_none());

        config.url = Some("https://project.supabase.co/".to_string());
        config.redirect_url = Some("https://app.example.org/".to_string());
        let client = SupabaseClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://project.supabase.co");
        assert_eq!(
            client.redirect_url.as_deref(),
            Some("https://app.example.org/auth/reset-password")
        );
    }

    #[tokio::test]
    async fn test_sign_in_and_current_user() {
        let client = SupabaseClient::new(start_server().await, "anon");
        assert_eq!(client.current_user().await.unwrap(), None);

        let data = client.sign_in("ada@example.org", "right").await.unwrap();
        assert_eq!(data.user.display_name.as_deref(), Some("Ada"));
        assert_eq!(
            client.current_session().await.unwrap().map(|s| s.access_token),
            Some(TOKEN.to_string())
        );

        let user = client.current_user().await.unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Ada Lovelace"));

        client.sign_out().await.unwrap();
        assert_eq!(client.current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_in_error_is_verbatim() {
        let client = SupabaseClient::new(start_server().await, "anon");
        let err = client.sign_in("ada@example.org", "wrong").await.unwrap_err();
        assert!(matches!(err, BackendError::Auth(ref message) if message == "Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_rejected_token_reads_as_signed_out() {
        let client = SupabaseClient::new(start_server().await, "anon");
        client.set_session(Some(Session {
            access_token: "expired".to_string(),
            refresh_token: None,
            expires_in: None,
            user: User {
                id: "user-1".to_string(),
                email: "ada@example.org".to_string(),
                display_name: None,
                avatar_url: None,
            },
        }));

        assert_eq!(client.current_user().await.unwrap(), None);
        assert_eq!(client.current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_settings_endpoints() {
        let client = SupabaseClient::new(start_server().await, "anon");

        let settings = client.get_user_settings("user-1").await.unwrap();
        assert!(settings.word_wrap);

        let merged = client
            .update_user_settings(
                "user-1",
                &UserSettingsPatch {
                    word_wrap: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!merged.word_wrap);

        assert!(matches!(
            client.get_user_settings("ghost").await,
            Err(BackendError::SettingsNotFound(_))
        ));
        assert!(matches!(
            client.update_user_settings("ghost", &UserSettingsPatch::default()).await,
            Err(BackendError::UnknownUser(_))
        ));
    }

    #[tokio::test]
    async fn test_save_document() {
        let client = SupabaseClient::new(start_server().await, "anon");
        client.save_document("paper-1", "Draft", "# Title").await.unwrap();
    }

    #[tokio::test]
    async fn test_rest_rejection_keeps_server_message() {
        let client = SupabaseClient::new(start_server().await, "anon");

        let err = client
            .save_document("paper-1", "Missing column", "# Title")
            .await
            .unwrap_err();
        assert!(!err.is_auth());
        assert!(matches!(
            err,
            BackendError::Api { status: 400, ref message } if message.contains("owner_id")
        ));

        let err = client.save_document("paper-1", "Expired", "# Title").await.unwrap_err();
        assert!(matches!(err, BackendError::Auth(ref message) if message == "JWT expired"));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_when_offline() {
        let client = SupabaseClient::new("http://127.0.0.1:9", "anon");
        client.set_session(Some(Session {
            access_token: TOKEN.to_string(),
            refresh_token: None,
            expires_in: None,
            user: User {
                id: "user-1".to_string(),
                email: "ada@example.org".to_string(),
                display_name: None,
                avatar_url: None,
            },
        }));

        assert!(matches!(client.sign_out().await, Err(BackendError::Transport(_))));
        assert_eq!(client.current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        // Nothing listens on port 9 of the loopback interface
        let client = SupabaseClient::new("http://127.0.0.1:9", "anon");
        assert!(matches!(
            client.sign_in("a@b.org", "pw").await,
            Err(BackendError::Transport(_))
        ));
    }
}
