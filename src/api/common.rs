use crate::error::{Error, Result};
use crate::model::{
    db::Question,
    mongodb::{Coll, Id},
};

/// Get a question from the database, or fail with [`Error::NotFound`].
pub async fn question_by_id(question_id: Id, questions: &Coll<Question>) -> Result<Question> {
    Question::find(questions, question_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Question with ID '{question_id}'")))
}
