//! Session Manager
//!
//! Keeps the single authoritative `{user, is_authenticated, loading}` state
//! in step with the identity provider.
//!
//! ## Architecture
//!
//! - **SessionManager**: the only writer of the state; login, register,
//!   logout, user updates and the pushed-change listener
//! - **SessionState** / **SessionPhase**: the snapshot readers observe
//!   through a `tokio::sync::watch` receiver
//! - **AuthOutcome**: login/register results as values, with classified
//!   failures

mod manager;
mod outcome;
mod state;

pub use manager::{SessionConfig, SessionManager};
pub use outcome::{
    AuthErrorKind, AuthFailure, AuthOutcome, CONFIRMATION_PENDING_MESSAGE,
    EMAIL_NOT_CONFIRMED_MESSAGE, INVALID_CREDENTIALS_MESSAGE, SUPERSEDED_MESSAGE,
    UNEXPECTED_ERROR_MESSAGE,
};
pub use state::{SessionPhase, SessionState};
