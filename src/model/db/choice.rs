use std::ops::{Deref, DerefMut};

use mongodb::{bson::doc, options::FindOptions};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::{Coll, Id};

/// Core choice data, linked to a specific question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCore {
    pub question_id: Id,
    pub choice_text: String,
    /// Only ever incremented, see [`Choice::cast_vote`].
    pub votes: u32,
}

/// A choice without an ID.
pub type NewChoice = ChoiceCore;

impl ChoiceCore {
    /// Create a new choice with zero votes.
    pub fn new(question_id: Id, choice_text: impl Into<String>) -> Self {
        Self {
            question_id,
            choice_text: choice_text.into(),
            votes: 0,
        }
    }
}

/// A choice from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub choice: ChoiceCore,
}

impl Choice {
    /// All choices of the given question, in the order they were created.
    pub async fn for_question(choices: &Coll<Choice>, question_id: Id) -> Result<Vec<Choice>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let question_choices = choices
            .find(doc! { "question_id": question_id }, options)
            .await?
            .try_collect::<Vec<_>>()
            .await?;
        Ok(question_choices)
    }

    /// Atomically add one vote to the given choice of the given question.
    ///
    /// The increment happens inside the database, so concurrent votes are never lost.
    /// Returns false iff no such choice belongs to that question, in which case
    /// nothing was modified.
    pub async fn cast_vote(choices: &Coll<Choice>, question_id: Id, choice_id: Id) -> Result<bool> {
        let filter = doc! {
            "_id": choice_id,
            "question_id": question_id,
        };
        let update = doc! {
            "$inc": { "votes": 1 }
        };
        let result = choices.update_one(filter, update, None).await?;
        Ok(result.matched_count == 1)
    }
}

impl Deref for Choice {
    type Target = ChoiceCore;

    fn deref(&self) -> &Self::Target {
        &self.choice
    }
}

impl DerefMut for Choice {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.choice
    }
}
