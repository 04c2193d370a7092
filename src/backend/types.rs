//! Identity-service types and the tri-state lookup result

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{BackendError, BackendResult};

/// Raw identity as returned by the auth service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// An authenticated session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds after which the access token is rejected
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    /// True when the token expires within `leeway_secs` of `now`
    pub fn is_expired(&self, now: DateTime<Utc>, leeway_secs: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - leeway_secs <= now.timestamp(),
            None => false,
        }
    }
}

/// Outcome of a sign-up request
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    pub user: AuthUser,
    /// `None` while the provider waits for email confirmation
    pub session: Option<AuthSession>,
}

impl SignUp {
    pub fn needs_confirmation(&self) -> bool {
        self.session.is_none() || !self.user.is_confirmed()
    }
}

/// Kind of session change pushed by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A session-change notification
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

impl AuthChange {
    pub fn signed_in(session: AuthSession) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
        }
    }
}

/// Result of a point lookup where "no row" is a valid answer
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(BackendError),
}

impl<T> Lookup<T> {
    /// Build from a fetch result, folding "no rows" errors into `NotFound`
    pub fn from_result(result: BackendResult<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Lookup::Found(value),
            Ok(None) => Lookup::NotFound,
            Err(e) if e.is_no_rows() => Lookup::NotFound,
            Err(e) => Lookup::Failed(e),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_result(self) -> BackendResult<Option<T>> {
        match self {
            Lookup::Found(value) => Ok(Some(value)),
            Lookup::NotFound => Ok(None),
            Lookup::Failed(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::error::NO_ROWS_CODE;

    fn user(confirmed: bool) -> AuthUser {
        AuthUser {
            id: "u-1".to_string(),
            email: Some("ana@example.com".to_string()),
            email_confirmed_at: confirmed.then(Utc::now),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_lookup_folds_no_rows() {
        let lookup: Lookup<u32> = Lookup::from_result(Err(BackendError::Api {
            status: 406,
            code: Some(NO_ROWS_CODE.to_string()),
            message: "no rows".to_string(),
        }));
        assert!(matches!(lookup, Lookup::NotFound));

        let lookup: Lookup<u32> = Lookup::from_result(Ok(None));
        assert!(matches!(lookup, Lookup::NotFound));

        let lookup: Lookup<u32> = Lookup::from_result(Err(BackendError::Timeout));
        assert!(matches!(lookup, Lookup::Failed(BackendError::Timeout)));

        let lookup = Lookup::from_result(Ok(Some(3)));
        assert!(lookup.is_found());
        assert_eq!(lookup.found(), Some(3));
    }

    #[test]
    fn test_sign_up_confirmation() {
        let pending = SignUp {
            user: user(false),
            session: None,
        };
        assert!(pending.needs_confirmation());

        let session = AuthSession {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: None,
            user: user(true),
        };
        let done = SignUp {
            user: user(true),
            session: Some(session),
        };
        assert!(!done.needs_confirmation());
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let mut session = AuthSession {
            access_token: "t".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: Some(now.timestamp() + 30),
            user: user(true),
        };
        assert!(!session.is_expired(now, 10));
        assert!(session.is_expired(now, 60));

        session.expires_at = None;
        assert!(!session.is_expired(now, 60));
    }
}
