//! Results of login and register
//!
//! Failures are values the caller renders inline, never errors that
//! escape to the rendering layer.

use crate::backend::BackendError;
use crate::models::User;

pub const INVALID_CREDENTIALS_MESSAGE: &str =
    "Invalid credentials. Check your email and password.";
pub const EMAIL_NOT_CONFIRMED_MESSAGE: &str =
    "Please confirm your email. Check your inbox and follow the confirmation link.";
pub const CONFIRMATION_PENDING_MESSAGE: &str =
    "Please check your email to confirm your account";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";
pub const SUPERSEDED_MESSAGE: &str = "Sign-in was cancelled by a newer session change";

/// Classification of authentication failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidCredentials,
    EmailNotConfirmed,
    /// A logout or pushed session change overtook the request
    Superseded,
    Other,
}

impl AuthErrorKind {
    /// Classify a provider error message
    pub fn classify(message: &str) -> Self {
        if message.contains("Invalid login credentials") {
            AuthErrorKind::InvalidCredentials
        } else if message.contains("Email not confirmed") {
            AuthErrorKind::EmailNotConfirmed
        } else {
            AuthErrorKind::Other
        }
    }
}

/// A classified authentication failure with its user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthFailure {
    pub fn superseded() -> Self {
        Self {
            kind: AuthErrorKind::Superseded,
            message: SUPERSEDED_MESSAGE.to_string(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: AuthErrorKind::Other,
            message: message.into(),
        }
    }
}

impl From<&BackendError> for AuthFailure {
    fn from(err: &BackendError) -> Self {
        match err {
            BackendError::Auth(message) | BackendError::Api { message, .. } => {
                match AuthErrorKind::classify(message) {
                    AuthErrorKind::InvalidCredentials => Self {
                        kind: AuthErrorKind::InvalidCredentials,
                        message: INVALID_CREDENTIALS_MESSAGE.to_string(),
                    },
                    AuthErrorKind::EmailNotConfirmed => Self {
                        kind: AuthErrorKind::EmailNotConfirmed,
                        message: EMAIL_NOT_CONFIRMED_MESSAGE.to_string(),
                    },
                    _ => Self::other(message.clone()),
                }
            }
            _ => Self::other(UNEXPECTED_ERROR_MESSAGE),
        }
    }
}

/// What a login or register call produced
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// Session established
    SignedIn(User),
    /// Identity created; waiting for email confirmation
    ConfirmationPending { message: String },
    Failed(AuthFailure),
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, AuthOutcome::Failed(_))
    }

    /// Informational (non-error) message, if any
    pub fn info(&self) -> Option<&str> {
        match self {
            AuthOutcome::ConfirmationPending { message } => Some(message),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AuthFailure> {
        match self {
            AuthOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthOutcome::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}
