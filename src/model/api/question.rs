use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::{Choice, Question},
};

/// Shown when a vote is submitted without a valid choice.
pub const NO_CHOICE_SELECTED: &str = "You didn't select a choice.";

/// An API-friendly question, without its choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: ApiId,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
}

impl From<Question> for QuestionSummary {
    fn from(question: Question) -> Self {
        Self {
            id: question.id.into(),
            question_text: question.question.question_text,
            pub_date: question.question.pub_date,
        }
    }
}

/// A choice as offered on the voting form. Vote counts are deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDescription {
    pub id: ApiId,
    pub choice_text: String,
}

impl From<Choice> for ChoiceDescription {
    fn from(choice: Choice) -> Self {
        Self {
            id: choice.id.into(),
            choice_text: choice.choice.choice_text,
        }
    }
}

/// The voting form for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub question: QuestionSummary,
    pub choices: Vec<ChoiceDescription>,
    /// Present iff this form is being re-shown after a rejected vote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl QuestionDetail {
    pub fn new(question: Question, choices: Vec<Choice>) -> Self {
        Self {
            question: question.into(),
            choices: choices.into_iter().map(Into::into).collect(),
            error_message: None,
        }
    }

    /// Attach an error message for re-display.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}
