//! Onboarding segmentation survey
//!
//! Four single-choice questions answered one step at a time. The answers
//! are only written once all four are present.

use super::{ValidationError, ValidationResult};
use crate::models::UserFilters;

/// A survey question and its options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub options: &'static [&'static str],
}

pub const QUESTIONS: [Question; 4] = [
    Question {
        title: "1. What kind of business do you run today?",
        subtitle: "Pick the option that describes you best",
        options: &[
            "Physical store",
            "Online store / eCommerce",
            "I sell through social media or WhatsApp",
            "Wholesale or catalogue sales",
            "Just starting / validating an idea",
            "Physical and online store",
        ],
    },
    Question {
        title: "2. Where do most of your sales happen?",
        subtitle: "Pick your main sales channel",
        options: &[
            "In my shop or showroom",
            "Through an online store",
            "On social media (Instagram, Facebook, etc.)",
            "On WhatsApp or other chats",
            "I don't have a main channel yet",
            "Marketplaces (MercadoLibre, Amazon, etc.)",
        ],
    },
    Question {
        title: "3. What is your main sales challenge?",
        subtitle: "Identify your biggest obstacle right now",
        options: &[
            "Getting more traffic / visits",
            "Turning visitors into customers",
            "Keeping existing customers",
            "Managing inventory",
            "Competing on price",
            "Reaching new markets",
        ],
    },
    Question {
        title: "4. What would you like to improve in your business?",
        subtitle: "Pick your top priority",
        options: &[
            "Selling more on key dates",
            "Planning my promotions better",
            "Improving my online / social presence",
            "Automating processes (payments, shipping, campaigns)",
            "Not sure yet, but I want to grow",
        ],
    },
];

/// Step-by-step answers to [`QUESTIONS`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyForm {
    answers: [String; 4],
    step: usize,
}

impl SurveyForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-based index of the current question
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn question(&self) -> &'static Question {
        &QUESTIONS[self.step]
    }

    pub fn answer(&self, step: usize) -> Option<&str> {
        self.answers.get(step).map(String::as_str)
    }

    pub fn is_last_step(&self) -> bool {
        self.step + 1 == QUESTIONS.len()
    }

    /// Answer the current question with one of its options
    pub fn select_option(&mut self, index: usize) -> ValidationResult<&'static str> {
        let option = self
            .question()
            .options
            .get(index)
            .copied()
            .ok_or(ValidationError::InvalidOption {
                step: self.step + 1,
                index,
            })?;
        self.answers[self.step] = option.to_string();
        Ok(option)
    }

    /// Answer the current question with free text
    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.answers[self.step] = answer.into();
    }

    pub fn is_step_answered(&self) -> bool {
        !self.answers[self.step].trim().is_empty()
    }

    /// Move to the next question; the current one must be answered
    ///
    /// Stays on the last question once there.
    pub fn next(&mut self) -> ValidationResult<()> {
        if !self.is_step_answered() {
            return Err(ValidationError::UnansweredStep(self.step + 1));
        }
        if !self.is_last_step() {
            self.step += 1;
        }
        Ok(())
    }

    pub fn back(&mut self) {
        self.step = self.step.saturating_sub(1);
    }

    /// All four answers, trimmed
    pub fn to_filters(&self) -> ValidationResult<UserFilters> {
        let unanswered = self.answers.iter().filter(|a| a.trim().is_empty()).count();
        if unanswered > 0 {
            return Err(ValidationError::IncompleteSurvey { unanswered });
        }
        Ok(UserFilters::from_answers(
            self.answers.clone().map(|a| a.trim().to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        assert_eq!(QUESTIONS.len(), 4);
        assert!(QUESTIONS.iter().all(|q| q.options.len() >= 5));
    }

    #[test]
    fn test_step_navigation() {
        let mut form = SurveyForm::new();
        assert_eq!(form.next(), Err(ValidationError::UnansweredStep(1)));
        assert_eq!(form.step(), 0);

        form.select_option(1).unwrap();
        form.next().unwrap();
        assert_eq!(form.step(), 1);

        form.back();
        assert_eq!(form.step(), 0);
        assert_eq!(form.answer(0), Some("Online store / eCommerce"));
        form.back();
        assert_eq!(form.step(), 0);
    }

    #[test]
    fn test_invalid_option() {
        let mut form = SurveyForm::new();
        assert_eq!(
            form.select_option(42),
            Err(ValidationError::InvalidOption { step: 1, index: 42 })
        );
        assert!(!form.is_step_answered());
    }

    #[test]
    fn test_complete_survey() {
        let mut form = SurveyForm::new();
        for _ in 0..QUESTIONS.len() {
            form.select_option(0).unwrap();
            form.next().unwrap();
        }
        assert!(form.is_last_step());

        let filters = form.to_filters().unwrap();
        assert_eq!(filters.question_1, "Physical store");
        assert_eq!(filters.question_4, "Selling more on key dates");
    }

    #[test]
    fn test_incomplete_survey_rejected() {
        let mut form = SurveyForm::new();
        form.select_option(0).unwrap();
        form.next().unwrap();
        form.set_answer("   ");

        assert_eq!(
            form.to_filters(),
            Err(ValidationError::IncompleteSurvey { unanswered: 3 })
        );
    }
}
