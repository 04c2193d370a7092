//! Hosted backend HTTP client
//!
//! Shared plumbing for the auth (`/auth/v1`) and table (`/rest/v1`)
//! endpoints: headers, retries, error decoding, and the current session.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

use super::error::{BackendError, BackendResult};
use super::query::TableQuery;
use super::session_file::SessionFile;
use super::types::{AuthChange, AuthSession};

/// Capacity of the session-change channel
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Hosted backend client implementing both gateway traits
pub struct HttpBackend {
    client: Client,
    config: HttpBackendConfig,
    session: RwLock<Option<AuthSession>>,
    session_file: Option<SessionFile>,
    changes: broadcast::Sender<AuthChange>,
}

/// Configuration for the HTTP backend
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Project URL (e.g., "https://xyz.supabase.co")
    pub base_url: String,
    /// Public anon key sent with every request
    pub anon_key: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum attempts for transient failures
    pub max_retries: u32,
    /// Where to persist the session; `None` keeps it in memory only
    pub session_file: Option<PathBuf>,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            request_timeout_ms: 10_000,
            max_retries: 3,
            session_file: None,
        }
    }
}

/// Whether a request may be sent again after it timed out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Replay {
    /// Repeating the request leaves the same end state (reads, updates,
    /// deletes, upserts)
    Idempotent,
    /// Inserts and token grants
    Once,
}

/// Error body shapes used by the auth and table endpoints
#[derive(Debug, Default, serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpBackend {
    /// Create a new client with the given configuration
    pub fn new(config: HttpBackendConfig) -> BackendResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(BackendError::Config("backend URL cannot be empty".into()));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BackendError::Config(
                "backend URL must start with http:// or https://".into(),
            ));
        }
        if config.anon_key.is_empty() {
            return Err(BackendError::Config("anon key cannot be empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(format!("futurecal/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BackendError::Request)?;

        let session_file = config.session_file.clone().map(SessionFile::new);
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            config: HttpBackendConfig { base_url, ..config },
            session: RwLock::new(None),
            session_file,
            changes,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url, path)
    }

    pub(crate) fn rest_url(&self, query: &TableQuery) -> String {
        let qs = query.to_query_string();
        if qs.is_empty() {
            format!("{}/rest/v1/{}", self.config.base_url, query.table())
        } else {
            format!("{}/rest/v1/{}?{}", self.config.base_url, query.table(), qs)
        }
    }

    /// Access token of the current session, or the anon key
    pub(crate) async fn bearer_token(&self) -> String {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    /// Request with the `apikey` and bearer headers set
    pub(crate) fn request(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    /// Send with retry on transient failures; non-2xx answers become errors
    ///
    /// A timed-out [`Replay::Once`] request may have been applied by the
    /// server, so it is never sent again. Connect failures and 429 answers
    /// are retried for every request.
    pub(crate) async fn send(
        &self,
        request: RequestBuilder,
        replay: Replay,
    ) -> BackendResult<Response> {
        let mut last_error = BackendError::Unavailable;
        let attempts = self.config.max_retries.max(1);

        for attempt in 0..attempts {
            if attempt > 0 {
                // Quadratic backoff: 200ms, 800ms, 1.8s...
                let delay = Duration::from_millis(200 * (attempt as u64).pow(2));
                tokio::time::sleep(delay).await;
            }

            let Some(attempt_request) = request.try_clone() else {
                return self.send_once(request).await;
            };

            match attempt_request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status().as_u16() == 429 => {
                    if let Some(retry_after) = response.headers().get("Retry-After") {
                        if let Ok(secs) = retry_after.to_str().unwrap_or("1").parse::<u64>() {
                            tokio::time::sleep(Duration::from_secs(secs)).await;
                        }
                    }
                    tracing::debug!(attempt, "Backend rate limited request");
                    last_error = BackendError::RateLimited;
                }
                Ok(response) => return Err(Self::error_from_response(response).await),
                Err(e) => {
                    last_error = BackendError::from_reqwest(e);
                    if !last_error.is_transient() {
                        return Err(last_error);
                    }
                    if replay == Replay::Once && matches!(last_error, BackendError::Timeout) {
                        tracing::warn!(attempt, "Request timed out and is not safe to resend");
                        return Err(last_error);
                    }
                    tracing::debug!(attempt, error = %last_error, "Transient backend failure");
                }
            }
        }

        Err(last_error)
    }

    async fn send_once(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await.map_err(BackendError::from_reqwest)?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    /// Decode a JSON body
    pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
        let text = response.text().await.map_err(BackendError::from_reqwest)?;
        serde_json::from_str(&text).map_err(BackendError::from)
    }

    pub(crate) async fn error_from_response(response: Response) -> BackendError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

        let code = body
            .error_code
            .or_else(|| match body.code {
                Some(serde_json::Value::String(s)) => Some(s),
                _ => None,
            });
        let message = body
            .error_description
            .or(body.msg)
            .or(body.message)
            .or(body.error)
            .unwrap_or(text);

        BackendError::Api {
            status,
            code,
            message,
        }
    }

    pub(crate) async fn current_session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    /// Replace the current session in memory and on disk
    pub(crate) async fn store_session(&self, session: Option<AuthSession>) {
        if let Some(file) = &self.session_file {
            let result = match &session {
                Some(s) => file.save(s),
                None => file.clear(),
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to persist session");
            }
        }
        *self.session.write().await = session;
    }

    pub(crate) fn load_persisted_session(&self) -> BackendResult<Option<AuthSession>> {
        match &self.session_file {
            Some(file) => file.load(),
            None => Ok(None),
        }
    }

    pub(crate) fn notify(&self, change: AuthChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }

    pub(crate) fn change_receiver(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::query::Order;

    fn config() -> HttpBackendConfig {
        HttpBackendConfig {
            base_url: "https://project.example.co/".to_string(),
            anon_key: "anon".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = HttpBackendConfig::default();
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.max_retries, 3);
        assert!(config.session_file.is_none());
    }

    #[test]
    fn test_urls_are_normalized() {
        let backend = HttpBackend::new(config()).unwrap();
        assert_eq!(
            backend.auth_url("token?grant_type=password"),
            "https://project.example.co/auth/v1/token?grant_type=password"
        );

        let query = TableQuery::from("events").select("*").order("date", Order::Asc);
        assert_eq!(
            backend.rest_url(&query),
            "https://project.example.co/rest/v1/events?select=*&order=date.asc"
        );
        assert_eq!(
            backend.rest_url(&TableQuery::from("events")),
            "https://project.example.co/rest/v1/events"
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut bad = config();
        bad.base_url = "project.example.co".to_string();
        assert!(matches!(HttpBackend::new(bad), Err(BackendError::Config(_))));

        let mut bad = config();
        bad.anon_key.clear();
        assert!(matches!(HttpBackend::new(bad), Err(BackendError::Config(_))));
    }

    #[tokio::test]
    async fn test_bearer_falls_back_to_anon_key() {
        let backend = HttpBackend::new(config()).unwrap();
        assert_eq!(backend.bearer_token().await, "anon");
    }
}
