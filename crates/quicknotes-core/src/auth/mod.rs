//! Firebase email/password auth client.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ResolvedFirebaseConfig;
use crate::util::{compact_text, unix_timestamp_now};

const EXPIRY_SKEW: Duration = Duration::from_secs(60);
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(EXPIRY_SKEW)
    }

    /// Whether the id token lapses before `window` has passed.
    #[must_use]
    pub fn expires_within(&self, window: Duration) -> bool {
        let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
        self.expires_at <= unix_timestamp_now().saturating_add(window)
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Auth request timed out")]
    Timeout,
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where a signed-in session lives between runs.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// The auth provider boundary used by the session gate and auth flow.
#[allow(async_fn_in_trait)]
pub trait AuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession>;
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession>;
    /// The current session, refreshed if it is about to expire.
    async fn current_session(&self) -> AuthResult<Option<AuthSession>>;
    async fn sign_out(&self) -> AuthResult<()>;
}

/// Session store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    session: Arc<Mutex<Option<AuthSession>>>,
}

impl SessionPersistence for InMemorySessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = self
            .session
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        Ok(guard.clone())
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        *guard = None;
        Ok(())
    }
}

#[derive(Clone)]
pub struct FirebaseAuthClient<S: SessionPersistence> {
    api_key: String,
    identity_url: String,
    token_url: String,
    request_timeout: Duration,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> FirebaseAuthClient<S> {
    pub fn new(config: &ResolvedFirebaseConfig, store: S) -> AuthResult<Self> {
        Self::with_endpoints(config, IDENTITY_TOOLKIT_URL, SECURE_TOKEN_URL, store)
    }

    /// Build a client against custom endpoints (e.g. the auth emulator).
    pub fn with_endpoints(
        config: &ResolvedFirebaseConfig,
        identity_url: &str,
        token_url: &str,
        store: S,
    ) -> AuthResult<Self> {
        let api_key = config.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Firebase API key must not be empty",
            ));
        }

        Ok(Self {
            api_key,
            identity_url: identity_url.trim_end_matches('/').to_string(),
            token_url: token_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
            client: Client::builder().build()?,
            store,
        })
    }

    pub async fn refresh_session(&self, session: &AuthSession) -> AuthResult<AuthSession> {
        if session.refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let request = self
            .client
            .post(format!("{}/token", self.token_url))
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ]);
        let response: RefreshResponse = self.send(request).await?;
        let refreshed = response.into_session(session.user.email.clone());

        self.store.save_session(&refreshed)?;
        Ok(refreshed)
    }

    /// The stored session, refreshed early when its id token would lapse
    /// within `min_validity`. A failed early refresh keeps a token that is
    /// still usable; a session that cannot be refreshed after expiry is
    /// cleared.
    pub async fn session_valid_for(
        &self,
        min_validity: Duration,
    ) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored_session.expires_within(min_validity) {
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) if !stored_session.is_expired() => {
                tracing::warn!("Early session refresh failed, keeping current token: {}", error);
                Ok(Some(stored_session))
            }
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    async fn password_request(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
            "returnSecureToken": true,
        });
        let request = self
            .client
            .post(format!("{}/accounts:{endpoint}", self.identity_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&payload);

        let response: PasswordAuthResponse = self.send(request).await?;
        let session = response.into_session()?;
        self.store.save_session(&session)?;
        Ok(session)
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> AuthResult<T> {
        let response = request
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        response.json::<T>().await.map_err(map_transport_error)
    }
}

impl<S: SessionPersistence> AuthProvider for FirebaseAuthClient<S> {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.password_request("signInWithPassword", email, password)
            .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.password_request("signUp", email, password).await
    }

    async fn current_session(&self) -> AuthResult<Option<AuthSession>> {
        self.session_valid_for(EXPIRY_SKEW).await
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.store.clear_session()
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() || password.trim().is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(())
}

fn map_transport_error(error: reqwest::Error) -> AuthError {
    if error.is_timeout() {
        AuthError::Timeout
    } else {
        AuthError::Http(error)
    }
}

/// Firebase encodes durations as decimal strings.
fn parse_expires_in(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(3600)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthResponse {
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    local_id: Option<String>,
    email: Option<String>,
}

impl PasswordAuthResponse {
    fn into_session(self) -> AuthResult<AuthSession> {
        match (self.id_token, self.refresh_token, self.local_id) {
            (Some(id_token), Some(refresh_token), Some(local_id)) => Ok(AuthSession {
                id_token,
                refresh_token,
                expires_at: unix_timestamp_now()
                    .saturating_add(parse_expires_in(self.expires_in.as_deref())),
                user: AuthUser {
                    id: local_id,
                    email: self.email,
                },
            }),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: Option<String>,
    user_id: String,
}

impl RefreshResponse {
    fn into_session(self, email: Option<String>) -> AuthSession {
        AuthSession {
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            expires_at: unix_timestamp_now()
                .saturating_add(parse_expires_in(self.expires_in.as_deref())),
            user: AuthUser {
                id: self.user_id,
                email,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorResponse {
    error: Option<FirebaseErrorBody>,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<FirebaseErrorResponse>(body) {
        if let Some(message) = payload.error.and_then(|error| error.message) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            id_token: "secret-id-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at,
            user: AuthUser {
                id: "user".to_string(),
                email: Some("user@example.com".to_string()),
            },
        }
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let rendered = format!("{:?}", session(1_700_000_000));
        assert!(!rendered.contains("secret-id-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn session_expiry_uses_skew() {
        assert!(session(unix_timestamp_now() + 30).is_expired());
        assert!(!session(unix_timestamp_now() + 3600).is_expired());
    }

    #[test]
    fn password_response_builds_session() {
        let response: PasswordAuthResponse = serde_json::from_str(
            r#"{
                "kind": "identitytoolkit#VerifyPasswordResponse",
                "localId": "uid-1",
                "email": "user@example.com",
                "idToken": "id",
                "refreshToken": "refresh",
                "expiresIn": "3600",
                "registered": true
            }"#,
        )
        .unwrap();

        let session = response.into_session().unwrap();
        assert_eq!(session.user.id, "uid-1");
        assert_eq!(session.user.email.as_deref(), Some("user@example.com"));
        assert!(session.expires_at > unix_timestamp_now() + 3000);
    }

    #[test]
    fn password_response_without_tokens_is_error() {
        let response: PasswordAuthResponse =
            serde_json::from_str(r#"{ "localId": "uid-1" }"#).unwrap();
        assert!(matches!(response.into_session(), Err(AuthError::Api(_))));
    }

    #[test]
    fn parse_api_error_reads_firebase_message() {
        let body = r#"{ "error": { "code": 400, "message": "EMAIL_EXISTS", "errors": [] } }"#;
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, body),
            "EMAIL_EXISTS (400)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn validate_credentials_rejects_blank_fields() {
        assert!(matches!(
            validate_credentials(" ", "secret"),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            validate_credentials("user@example.com", ""),
            Err(AuthError::MissingCredentials)
        ));
        assert!(validate_credentials("user@example.com", "secret").is_ok());
    }

    #[test]
    fn in_memory_store_round_trips_and_clears() {
        let store = InMemorySessionStore::default();
        assert!(store.load_session().unwrap().is_none());
        store.save_session(&session(10)).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(session(10)));
        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn current_session_returns_fresh_stored_session_without_network() {
        let config = crate::config::FirebaseConfig {
            api_key: Some("key".to_string()),
            database_url: Some("http://127.0.0.1:9".to_string()),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        let store = InMemorySessionStore::default();
        let fresh = session(unix_timestamp_now() + 3600);
        store.save_session(&fresh).unwrap();

        let client = FirebaseAuthClient::new(&config, store.clone()).unwrap();
        assert_eq!(client.current_session().await.unwrap(), Some(fresh));

        client.sign_out().await.unwrap();
        assert!(store.load_session().unwrap().is_none());
    }

    fn test_config() -> ResolvedFirebaseConfig {
        crate::config::FirebaseConfig {
            api_key: Some("key".to_string()),
            database_url: Some("http://127.0.0.1:9".to_string()),
            ..Default::default()
        }
        .resolve()
        .unwrap()
    }

    /// Answer a single HTTP request on a loopback port with `body`.
    fn serve_once(body: &'static str) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buffer = [0_u8; 1024];
            loop {
                let read = stream.read(&mut buffer).unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
                let Some(header_end) = request.windows(4).position(|window| window == b"\r\n\r\n")
                else {
                    continue;
                };
                let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{address}")
    }

    #[test]
    fn expires_within_compares_against_window() {
        let five_minutes = session(unix_timestamp_now() + 300);
        assert!(!five_minutes.is_expired());
        assert!(five_minutes.expires_within(Duration::from_secs(12 * 60)));
        assert!(!five_minutes.expires_within(Duration::from_secs(60)));
        assert!(session(0).expires_within(Duration::MAX));
    }

    #[tokio::test]
    async fn session_valid_for_refreshes_token_expiring_inside_window() {
        let token_url = serve_once(
            r#"{"id_token":"new-id-token","refresh_token":"new-refresh-token","expires_in":"3600","user_id":"user"}"#,
        );
        let store = InMemorySessionStore::default();
        store
            .save_session(&session(unix_timestamp_now() + 300))
            .unwrap();
        let client = FirebaseAuthClient::with_endpoints(
            &test_config(),
            "http://127.0.0.1:9",
            &token_url,
            store.clone(),
        )
        .unwrap();

        let unchanged = client.current_session().await.unwrap().unwrap();
        assert_eq!(unchanged.id_token, "secret-id-token");

        let refreshed = client
            .session_valid_for(Duration::from_secs(12 * 60))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.id_token, "new-id-token");
        assert!(refreshed.expires_at > unix_timestamp_now() + 3000);
        assert_eq!(
            store.load_session().unwrap().map(|stored| stored.id_token),
            Some("new-id-token".to_string())
        );
    }

    #[tokio::test]
    async fn failed_early_refresh_keeps_usable_token() {
        let store = InMemorySessionStore::default();
        let current = session(unix_timestamp_now() + 300);
        store.save_session(&current).unwrap();
        let client = FirebaseAuthClient::with_endpoints(
            &test_config(),
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
            store.clone(),
        )
        .unwrap();

        let kept = client
            .session_valid_for(Duration::from_secs(12 * 60))
            .await
            .unwrap();
        assert_eq!(kept, Some(current.clone()));
        assert_eq!(store.load_session().unwrap(), Some(current));
    }
}
