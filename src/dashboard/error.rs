//! Dashboard error types

use thiserror::Error;

use crate::backend::BackendError;
use crate::forms::ValidationError;

/// Errors returned by dashboard operations
#[derive(Error, Debug)]
pub enum DashboardError {
    /// The form was rejected before reaching the backend
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Please sign in first")]
    NotAuthenticated,

    /// Only the creator may edit or delete an event
    #[error("Only the creator can modify event {0}")]
    NotOwner(String),

    /// The event has not been loaded by this dashboard
    #[error("Event not found: {0}")]
    UnknownEvent(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl DashboardError {
    /// True for problems the user can fix by editing the input
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DashboardError::Validation(_)
                | DashboardError::NotAuthenticated
                | DashboardError::NotOwner(_)
                | DashboardError::UnknownEvent(_)
        )
    }
}

/// Result type for dashboard operations
pub type DashboardResult<T> = Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        assert!(DashboardError::from(ValidationError::Required("Title")).is_user_error());
        assert!(DashboardError::NotOwner("e-1".to_string()).is_user_error());
        assert!(!DashboardError::from(BackendError::Timeout).is_user_error());
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = DashboardError::from(ValidationError::Required("Title"));
        assert_eq!(err.to_string(), "Title is required");
    }
}
