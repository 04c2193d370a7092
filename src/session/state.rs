//! Session state snapshot

use serde::Serialize;

use crate::models::User;

/// The single authoritative session state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub loading: bool,
}

/// Where the session currently sits in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Loading,
    Unauthenticated,
    AuthenticatedIncomplete,
    AuthenticatedComplete,
}

impl Default for SessionState {
    /// Initial state: nothing known yet
    fn default() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            loading: true,
        }
    }
}

impl SessionState {
    pub fn signed_out() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            loading: false,
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
            loading: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.is_authenticated) {
            (Some(user), true) if user.has_completed_segmentation => {
                SessionPhase::AuthenticatedComplete
            }
            (Some(_), true) => SessionPhase::AuthenticatedIncomplete,
            _ if self.loading => SessionPhase::Loading,
            _ => SessionPhase::Unauthenticated,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match (&self.user, self.is_authenticated) {
            (Some(user), true) => Some(user.id.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Loading => write!(f, "loading"),
            SessionPhase::Unauthenticated => write!(f, "signed out"),
            SessionPhase::AuthenticatedIncomplete => write!(f, "signed in (survey pending)"),
            SessionPhase::AuthenticatedComplete => write!(f, "signed in"),
        }
    }
}
