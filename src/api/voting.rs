use log::{debug, info};
use rocket::{
    form::Form,
    response::{Redirect, Responder},
    serde::json::Json,
    Route,
};

use crate::error::Result;
use crate::model::{
    api::question::{QuestionDetail, NO_CHOICE_SELECTED},
    db::{Choice, Question},
    mongodb::{Coll, Id},
};

use super::common::question_by_id;

pub fn routes() -> Vec<Route> {
    routes![vote]
}

/// A vote as submitted by the voting form.
#[derive(Debug, FromForm)]
pub(crate) struct VoteForm<'r> {
    /// The ID of the selected choice, if any.
    choice: Option<&'r str>,
}

/// The two ways a vote submission can end.
#[derive(Responder)]
enum VoteOutcome {
    /// The vote was counted; go and see the results.
    Recorded(Redirect),
    /// No valid choice was selected; show the form again with an error.
    Rejected(Json<QuestionDetail>),
}

#[post("/<question_id>/vote", data = "<submission>")]
async fn vote(
    question_id: Id,
    submission: Option<Form<VoteForm<'_>>>,
    questions: Coll<Question>,
    choices: Coll<Choice>,
) -> Result<VoteOutcome> {
    let question = question_by_id(question_id, &questions).await?;

    // A body that isn't a form has no choice in it.
    let selected = submission.as_ref().and_then(|form| form.choice);

    // A malformed ID can't match any choice, so it is treated like a missing one.
    if let Some(choice_id) = selected.and_then(|c| c.parse::<Id>().ok()) {
        if Choice::cast_vote(&choices, question_id, choice_id).await? {
            info!("Counted vote for choice {choice_id} of question {question_id}");
            return Ok(VoteOutcome::Recorded(Redirect::found(uri!(
                super::public::results(question_id)
            ))));
        }
    }

    debug!("Rejected vote for question {question_id} with choice {selected:?}");
    let question_choices = Choice::for_question(&choices, question_id).await?;
    let detail = QuestionDetail::new(question, question_choices).with_error(NO_CHOICE_SELECTED);
    Ok(VoteOutcome::Rejected(Json(detail)))
}
