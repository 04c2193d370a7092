//! Identity service over `/auth/v1`

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::error::{BackendError, BackendResult};
use super::http::{HttpBackend, Replay};
use super::types::{AuthChange, AuthEvent, AuthSession, AuthUser, SignUp};
use super::IdentityProvider;

/// Refresh tokens this many seconds before they expire
const EXPIRY_LEEWAY_SECS: i64 = 30;

#[derive(Debug, Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Session as returned by the token and signup endpoints
#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<SessionResponse> for AuthSession {
    fn from(raw: SessionResponse) -> Self {
        let expires_at = raw
            .expires_at
            .or_else(|| raw.expires_in.map(|secs| Utc::now().timestamp() + secs));
        AuthSession {
            access_token: raw.access_token,
            refresh_token: raw.refresh_token,
            expires_at,
            user: raw.user,
        }
    }
}

/// Client errors from the auth endpoints are credential problems
fn auth_error(err: BackendError) -> BackendError {
    match err {
        BackendError::Api {
            status, message, ..
        } if (400..500).contains(&status) && status != 429 => BackendError::Auth(message),
        other => other,
    }
}

impl HttpBackend {
    async fn token_request<T: Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &T,
    ) -> BackendResult<AuthSession> {
        let url = self.auth_url(&format!("token?grant_type={}", grant_type));
        let request = self
            .request(Method::POST, &url, &self.config().anon_key)
            .json(body);

        let response = self.send(request, Replay::Once).await.map_err(auth_error)?;
        let raw: SessionResponse = Self::decode(response).await?;
        Ok(raw.into())
    }

    async fn refresh_session(&self, refresh_token: &str) -> BackendResult<AuthSession> {
        tracing::debug!("Refreshing access token");
        self.token_request("refresh_token", &RefreshRequest { refresh_token })
            .await
    }

    async fn logout_request(&self, path: &str, access_token: &str) -> BackendResult<()> {
        let url = self.auth_url(path);
        let request = self.request(Method::POST, &url, access_token);
        match self.send(request, Replay::Idempotent).await {
            Ok(_) => Ok(()),
            // Token already invalid on the server
            Err(BackendError::Api { status: 401, .. }) | Err(BackendError::Api { status: 404, .. }) => {
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote sign-out failed");
                Err(e)
            }
        }
    }

    async fn start_session(&self, session: AuthSession, event: AuthEvent) {
        self.store_session(Some(session.clone())).await;
        self.notify(AuthChange {
            event,
            session: Some(session),
        });
    }
}

#[async_trait]
impl IdentityProvider for HttpBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUp> {
        let url = self.auth_url("signup");
        tracing::debug!(url = %url, email = %email, "Signing up");

        let request = self
            .request(Method::POST, &url, &self.config().anon_key)
            .json(&PasswordRequest { email, password });
        let response = self.send(request, Replay::Once).await.map_err(auth_error)?;
        let body: serde_json::Value = Self::decode(response).await?;

        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value::<SessionResponse>(body)?.into();
            let sign_up = SignUp {
                user: session.user.clone(),
                session: Some(session.clone()),
            };
            // An unconfirmed identity must not become the current session
            if sign_up.needs_confirmation() {
                tracing::info!(user_id = %sign_up.user.id, "Sign-up session held until email confirmation");
            } else {
                tracing::info!(user_id = %sign_up.user.id, "Sign-up returned a session");
                self.start_session(session, AuthEvent::SignedIn).await;
            }
            return Ok(sign_up);
        }

        // Confirmation pending: either a bare user or `{user, session: null}`
        let user_value = match body.get("user") {
            Some(user) if user.is_object() => user.clone(),
            _ => body,
        };
        let user: AuthUser = serde_json::from_value(user_value)?;
        tracing::info!(user_id = %user.id, "Sign-up awaiting email confirmation");

        Ok(SignUp {
            user,
            session: None,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AuthSession> {
        tracing::debug!(email = %email, "Signing in with password");

        let session = self
            .token_request("password", &PasswordRequest { email, password })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Sign-in rejected");
                e
            })?;

        tracing::info!(user_id = %session.user.id, "Sign-in successful");
        self.start_session(session.clone(), AuthEvent::SignedIn).await;
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let session = self.current_session().await;

        // Local state goes regardless of what the server says
        self.store_session(None).await;
        self.notify(AuthChange::signed_out());

        let Some(session) = session else {
            return Ok(());
        };

        self.logout_request("logout", &session.access_token).await
    }

    async fn revoke_session(
        &self,
        session: &AuthSession,
        replacement: Option<&AuthSession>,
    ) -> BackendResult<()> {
        let is_current = self
            .current_session()
            .await
            .is_some_and(|current| current.access_token == session.access_token);

        if is_current {
            self.store_session(replacement.cloned()).await;
            if replacement.is_none() {
                self.notify(AuthChange::signed_out());
            }
        }

        tracing::debug!(user_id = %session.user.id, is_current, "Revoking session");
        // Local scope ends this session only, not the user's other sessions
        self.logout_request("logout?scope=local", &session.access_token)
            .await
    }

    async fn get_session(&self) -> BackendResult<Option<AuthSession>> {
        let session = match self.current_session().await {
            Some(session) => Some(session),
            None => {
                let persisted = self.load_persisted_session()?;
                if let Some(session) = &persisted {
                    self.store_session(Some(session.clone())).await;
                }
                persisted
            }
        };

        let Some(session) = session else {
            return Ok(None);
        };

        if !session.is_expired(Utc::now(), EXPIRY_LEEWAY_SECS) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            tracing::info!("Stored session expired without a refresh token");
            self.store_session(None).await;
            return Ok(None);
        };

        match self.refresh_session(&refresh_token).await {
            Ok(refreshed) => {
                self.start_session(refreshed.clone(), AuthEvent::TokenRefreshed)
                    .await;
                Ok(Some(refreshed))
            }
            Err(BackendError::Auth(message)) => {
                tracing::info!(reason = %message, "Refresh token rejected, dropping session");
                self.store_session(None).await;
                self.notify(AuthChange::signed_out());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.change_receiver()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_response_expiry_from_expires_in() {
        let raw: SessionResponse = serde_json::from_str(
            r#"{
                "access_token": "a",
                "refresh_token": "r",
                "expires_in": 3600,
                "user": {"id": "u-1", "email": "ana@example.com", "created_at": "2024-05-01T10:00:00Z"}
            }"#,
        )
        .unwrap();

        let before = Utc::now().timestamp();
        let session: AuthSession = raw.into();
        let expires_at = session.expires_at.unwrap();
        assert!(expires_at >= before + 3600);
        assert!(expires_at <= Utc::now().timestamp() + 3600);
    }

    #[test]
    fn test_auth_error_mapping() {
        let err = auth_error(BackendError::Api {
            status: 400,
            code: None,
            message: "Invalid login credentials".to_string(),
        });
        assert!(matches!(err, BackendError::Auth(ref m) if m == "Invalid login credentials"));

        let err = auth_error(BackendError::Api {
            status: 500,
            code: None,
            message: "boom".to_string(),
        });
        assert!(matches!(err, BackendError::Api { status: 500, .. }));
    }
}
