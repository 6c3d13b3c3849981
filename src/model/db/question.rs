use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, DateTime as BsonDateTime},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    db::choice::{Choice, NewChoice},
    mongodb::{Coll, Id},
};

/// How many questions the index listing shows at most.
pub const LATEST_QUESTIONS: i64 = 5;

/// Core question data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCore {
    /// The poll prompt.
    pub question_text: String,
    /// When the question becomes visible in the index listing.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub pub_date: DateTime<Utc>,
}

/// A question without an ID.
pub type NewQuestion = QuestionCore;

impl QuestionCore {
    pub fn new(question_text: impl Into<String>, pub_date: DateTime<Utc>) -> Self {
        Self {
            question_text: question_text.into(),
            pub_date,
        }
    }

    /// Insert this question along with a fresh, zero-vote choice for each
    /// of the given labels, in the order given.
    pub async fn insert<I, S>(
        self,
        questions: &Coll<Question>,
        choices: &Coll<Choice>,
        choice_texts: I,
    ) -> Result<Id>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let question = Question {
            id: Id::new(),
            question: self,
        };
        questions.insert_one(&question, None).await?;

        // IDs are generated in order, so ascending ID order is insertion order.
        let new_choices = choice_texts
            .into_iter()
            .map(|text| Choice {
                id: Id::new(),
                choice: NewChoice::new(question.id, text),
            })
            .collect::<Vec<_>>();
        if !new_choices.is_empty() {
            choices.insert_many(new_choices, None).await?;
        }

        Ok(question.id)
    }
}

/// A question from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub question: QuestionCore,
}

impl Question {
    /// The most recently published questions as of `now`, newest first.
    ///
    /// Questions scheduled for the future are never included.
    pub async fn latest(
        questions: &Coll<Question>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Question>> {
        let filter = doc! {
            "pub_date": { "$lte": BsonDateTime::from_chrono(now) },
        };
        let options = FindOptions::builder()
            .sort(doc! { "pub_date": -1 })
            .limit(limit)
            .build();

        let latest = questions
            .find(filter, options)
            .await?
            .try_collect::<Vec<_>>()
            .await?;
        Ok(latest)
    }

    /// Look up a single question.
    pub async fn find(questions: &Coll<Question>, question_id: Id) -> Result<Option<Question>> {
        Ok(questions.find_one(question_id.as_doc(), None).await?)
    }

    /// Delete a question and every choice it owns.
    ///
    /// Choices go first so that an interrupted delete never leaves orphans behind.
    /// Returns false iff the question did not exist.
    pub async fn delete(
        questions: &Coll<Question>,
        choices: &Coll<Choice>,
        question_id: Id,
    ) -> Result<bool> {
        choices
            .delete_many(doc! { "question_id": question_id }, None)
            .await?;
        let result = questions.delete_one(question_id.as_doc(), None).await?;
        Ok(result.deleted_count == 1)
    }
}

impl Deref for Question {
    type Target = QuestionCore;

    fn deref(&self) -> &Self::Target {
        &self.question
    }
}

impl DerefMut for Question {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.question
    }
}
