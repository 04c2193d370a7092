//! Signed-in user and onboarding answers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The domain user held by the session manager
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    /// True iff a `user_filters` row exists for this user
    pub has_completed_segmentation: bool,
    #[serde(default)]
    pub filters: Option<UserFilters>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Copy of this user with the survey marked as completed
    pub fn with_filters(&self, filters: UserFilters) -> Self {
        Self {
            filters: Some(filters),
            has_completed_segmentation: true,
            ..self.clone()
        }
    }
}

/// The four onboarding answers, always written together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFilters {
    pub question_1: String,
    pub question_2: String,
    pub question_3: String,
    pub question_4: String,
}

impl UserFilters {
    pub fn from_answers(answers: [String; 4]) -> Self {
        let [question_1, question_2, question_3, question_4] = answers;
        Self {
            question_1,
            question_2,
            question_3,
            question_4,
        }
    }

    pub fn answers(&self) -> [&str; 4] {
        [
            &self.question_1,
            &self.question_2,
            &self.question_3,
            &self.question_4,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_deserialize_ignores_row_metadata() {
        let row = r#"{
            "id": 7,
            "user_id": "u-1",
            "question_1": "Tienda física",
            "question_2": "En mi local o showroom",
            "question_3": "Competir con precios",
            "question_4": "Planificar mejor mis promociones",
            "created_at": "2024-05-01T10:00:00+00:00"
        }"#;

        let filters: UserFilters = serde_json::from_str(row).unwrap();
        assert_eq!(filters.question_1, "Tienda física");
        assert_eq!(filters.answers()[3], "Planificar mejor mis promociones");
    }

    #[test]
    fn test_with_filters_marks_completion() {
        let user = User {
            id: "u-1".to_string(),
            email: "ana@example.com".to_string(),
            has_completed_segmentation: false,
            filters: None,
            created_at: Utc::now(),
        };
        let filters = UserFilters::from_answers([
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "d".to_string(),
        ]);

        let updated = user.with_filters(filters.clone());
        assert!(updated.has_completed_segmentation);
        assert_eq!(updated.filters, Some(filters));
        assert_eq!(updated.email, user.email);
    }
}
