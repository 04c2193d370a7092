//! Write-side validation
//!
//! Every write goes through one of these forms first. Forms hold the raw
//! text a user typed and turn it into a typed backend payload, or a
//! [`ValidationError`] describing the first problem found.

mod credentials;
mod event;
mod product;
mod sale;
mod survey;

pub use credentials::{Credentials, MIN_PASSWORD_LEN};
pub use event::{EventForm, DEFAULT_EVENT_TIME};
pub use product::ProductForm;
pub use sale::SaleForm;
pub use survey::{Question, SurveyForm, QUESTIONS};

use thiserror::Error;

use crate::models::UnknownPlatform;

/// Why a form was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be greater than 0")]
    NotPositive(&'static str),

    #[error("{field} must be a number, got '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Product not found: {0}")]
    UnknownProduct(String),

    #[error(transparent)]
    UnknownPlatform(#[from] UnknownPlatform),

    #[error("Please answer all questions before continuing ({unanswered} left)")]
    IncompleteSurvey { unanswered: usize },

    #[error("Question {step} has no option {index}")]
    InvalidOption { step: usize, index: usize },

    #[error("Please answer question {0} first")]
    UnansweredStep(usize),
}

/// Result type for form validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trimmed value, or `Required` if nothing is left
fn required(value: &str, field: &'static str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed.to_string())
}

/// Parse a strictly positive decimal
fn positive_amount(value: &str, field: &'static str) -> ValidationResult<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    let amount: f64 = trimmed.parse().map_err(|_| ValidationError::InvalidNumber {
        field,
        value: trimmed.to_string(),
    })?;
    if !amount.is_finite() {
        return Err(ValidationError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        });
    }
    if amount <= 0.0 {
        return Err(ValidationError::NotPositive(field));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  Launch  ", "Title").unwrap(), "Launch");
        assert_eq!(required(" \t", "Title"), Err(ValidationError::Required("Title")));
    }

    #[test]
    fn test_positive_amount() {
        assert_eq!(positive_amount("12.50", "Price").unwrap(), 12.5);
        assert_eq!(
            positive_amount("0", "Price"),
            Err(ValidationError::NotPositive("Price"))
        );
        assert_eq!(
            positive_amount("-3", "Price"),
            Err(ValidationError::NotPositive("Price"))
        );
        assert!(matches!(
            positive_amount("abc", "Price"),
            Err(ValidationError::InvalidNumber { field: "Price", .. })
        ));
        assert!(matches!(
            positive_amount("inf", "Price"),
            Err(ValidationError::InvalidNumber { .. })
        ));
        assert_eq!(positive_amount("", "Price"), Err(ValidationError::Required("Price")));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ValidationError::Required("Title").to_string(), "Title is required");
        assert_eq!(
            ValidationError::PasswordTooShort { min: 6 }.to_string(),
            "Password must be at least 6 characters"
        );
    }
}
