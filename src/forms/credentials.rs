//! Login / register form

use super::{ValidationError, ValidationResult};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Email and password as typed
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Check the credentials before any auth call
    pub fn validate(&self) -> ValidationResult<()> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ValidationError::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(())
    }

    /// Email with surrounding whitespace removed
    pub fn email(&self) -> &str {
        self.email.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_credentials() {
        let creds = Credentials::new(" ana@example.com ", "secret1");
        assert!(creds.validate().is_ok());
        assert_eq!(creds.email(), "ana@example.com");
    }

    #[test]
    fn test_rejects_email_without_at() {
        assert_eq!(
            Credentials::new("ana.example.com", "secret1").validate(),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            Credentials::new("", "secret1").validate(),
            Err(ValidationError::InvalidEmail)
        );
    }

    #[test]
    fn test_rejects_short_password() {
        assert_eq!(
            Credentials::new("ana@example.com", "12345").validate(),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );
        assert!(Credentials::new("ana@example.com", "123456").validate().is_ok());
    }
}
