use chrono::Utc;
use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        question::{QuestionDetail, QuestionSummary},
        results::QuestionResults,
    },
    db::{Choice, Question, LATEST_QUESTIONS},
    mongodb::{Coll, Id},
};

use super::common::question_by_id;

pub fn routes() -> Vec<Route> {
    routes![index, detail, results]
}

#[get("/")]
async fn index(questions: Coll<Question>) -> Result<Json<Vec<QuestionSummary>>> {
    let latest = Question::latest(&questions, Utc::now(), LATEST_QUESTIONS).await?;
    Ok(Json(latest.into_iter().map(Into::into).collect()))
}

#[get("/<question_id>")]
async fn detail(
    question_id: Id,
    questions: Coll<Question>,
    choices: Coll<Choice>,
) -> Result<Json<QuestionDetail>> {
    let question = question_by_id(question_id, &questions).await?;
    let question_choices = Choice::for_question(&choices, question_id).await?;
    Ok(Json(QuestionDetail::new(question, question_choices)))
}

#[get("/<question_id>/results")]
pub(super) async fn results(
    question_id: Id,
    questions: Coll<Question>,
    choices: Coll<Choice>,
) -> Result<Json<QuestionResults>> {
    let question = question_by_id(question_id, &questions).await?;
    let question_choices = Choice::for_question(&choices, question_id).await?;
    Ok(Json(QuestionResults::new(question, question_choices)))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use mongodb::Database;
    use rocket::{http::Status, local::asynchronous::Client, serde::json::serde_json};

    use crate::model::{
        api::chart::{Bar, CHART_HEIGHT, CHART_WIDTH},
        db::{examples::insert_q1, NewQuestion},
    };

    use super::*;

    async fn get_index(client: &Client) -> Vec<QuestionSummary> {
        let response = client.get(uri!(index)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let raw_response = response.into_string().await.unwrap();
        serde_json::from_str(&raw_response).unwrap()
    }

    async fn get_results(client: &Client, question_id: Id) -> QuestionResults {
        let response = client.get(uri!(results(question_id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let raw_response = response.into_string().await.unwrap();
        serde_json::from_str(&raw_response).unwrap()
    }

    async fn vote_counts(db: &Database, question_id: Id) -> Vec<u32> {
        Choice::for_question(&Coll::from_db(db), question_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.votes)
            .collect()
    }

    #[backend_test]
    async fn index_with_no_questions(client: Client) {
        assert!(get_index(&client).await.is_empty());
    }

    #[backend_test]
    async fn index_hides_future_questions(client: Client, db: Database) {
        let questions = Coll::<Question>::from_db(&db);
        let choices = Coll::<Choice>::from_db(&db);
        let past = NewQuestion::example()
            .insert(&questions, &choices, ["Not much"])
            .await
            .unwrap();
        NewQuestion::future_example()
            .insert(&questions, &choices, ["Who knows"])
            .await
            .unwrap();

        let listed = get_index(&client).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(*listed[0].id, past);
        assert_eq!(listed[0].question_text, NewQuestion::example().question_text);
    }

    #[backend_test]
    async fn index_shows_five_newest_first(client: Client, db: Database) {
        let questions = Coll::<Question>::from_db(&db);
        let choices = Coll::<Choice>::from_db(&db);
        let now = Utc::now();
        for hours_ago in [10, 2, 8, 4, 6, 1, 12, 3] {
            NewQuestion::new(format!("{hours_ago}h"), now - Duration::hours(hours_ago))
                .insert(&questions, &choices, ["Yes", "No"])
                .await
                .unwrap();
        }

        let listed = get_index(&client).await;
        let texts = listed
            .iter()
            .map(|q| q.question_text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["1h", "2h", "3h", "4h", "6h"]);
        assert!(listed.windows(2).all(|w| w[0].pub_date >= w[1].pub_date));
    }

    #[backend_test]
    async fn detail_lists_choices_in_order(client: Client, db: Database) {
        let (q1, a, b) = insert_q1(&db).await;

        let response = client.get(uri!(detail(q1))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let raw_response = response.into_string().await.unwrap();
        // Vote counts are not part of the voting form.
        assert!(!raw_response.contains("votes"));
        let fetched = serde_json::from_str::<QuestionDetail>(&raw_response).unwrap();

        assert_eq!(*fetched.question.id, q1);
        assert_eq!(fetched.question.question_text, "Q1");
        let ids = fetched.choices.iter().map(|c| *c.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![a, b]);
        let texts = fetched
            .choices
            .iter()
            .map(|c| c.choice_text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["A", "B"]);
        assert_eq!(fetched.error_message, None);
    }

    #[backend_test]
    async fn trailing_slash_reaches_the_same_views(client: Client, db: Database) {
        let (q1, _, _) = insert_q1(&db).await;

        let response = client.get(format!("/{q1}/")).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let fetched = response.into_json::<QuestionDetail>().await.unwrap();
        assert_eq!(*fetched.question.id, q1);

        let response = client.get(format!("/{q1}/results/")).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let fetched = response.into_json::<QuestionResults>().await.unwrap();
        assert_eq!(fetched.chart.bars.len(), 2);
    }

    #[backend_test]
    async fn detail_of_missing_question(client: Client, db: Database) {
        insert_q1(&db).await;

        let response = client.get(uri!(detail(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let response = client.get("/not-an-id/").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn results_show_vote_counts(client: Client, db: Database) {
        let (q1, a, b) = insert_q1(&db).await;
        let choices = Coll::<Choice>::from_db(&db);
        for _ in 0..3 {
            Choice::cast_vote(&choices, q1, a).await.unwrap();
        }
        Choice::cast_vote(&choices, q1, b).await.unwrap();

        let fetched = get_results(&client, q1).await;
        assert_eq!(*fetched.question.id, q1);
        assert_eq!(fetched.chart.width, CHART_WIDTH);
        assert_eq!(fetched.chart.height, CHART_HEIGHT);
        assert_eq!(
            fetched.chart.bars,
            vec![
                Bar {
                    label: "A".to_string(),
                    value: 3
                },
                Bar {
                    label: "B".to_string(),
                    value: 1
                },
            ]
        );
        assert!(fetched.graph.starts_with("<svg "));
        assert!(fetched.graph.contains("<title>A: 3</title>"));
        assert!(fetched.graph.contains("<title>B: 1</title>"));
    }

    #[backend_test]
    async fn results_of_question_without_choices(client: Client, db: Database) {
        let question_id = NewQuestion::example()
            .insert(&Coll::from_db(&db), &Coll::from_db(&db), Vec::<String>::new())
            .await
            .unwrap();

        let fetched = get_results(&client, question_id).await;
        assert!(fetched.chart.bars.is_empty());
        assert!(fetched.graph.starts_with("<svg "));
    }

    #[backend_test]
    async fn results_of_missing_question(client: Client) {
        let response = client.get(uri!(results(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn reads_never_change_votes(client: Client, db: Database) {
        let (q1, a, _) = insert_q1(&db).await;
        Choice::cast_vote(&Coll::from_db(&db), q1, a).await.unwrap();

        for _ in 0..3 {
            get_index(&client).await;
            let response = client.get(uri!(detail(q1))).dispatch().await;
            assert_eq!(Status::Ok, response.status());
            get_results(&client, q1).await;
        }

        assert_eq!(vote_counts(&db, q1).await, vec![1, 0]);
    }
}
