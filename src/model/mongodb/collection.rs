use std::ops::Deref;

use log::debug;
use mongodb::{bson::doc, error::Error as DbError, Collection, Database, IndexModel};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{Choice, Question};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Question collections
const QUESTIONS: &str = "questions";
impl MongoCollection for Question {
    const NAME: &'static str = QUESTIONS;
}

// Choice collections
const CHOICES: &str = "choices";
impl MongoCollection for Choice {
    const NAME: &'static str = CHOICES;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    // Question collection: the index listing sorts by newest first.
    let question_index = IndexModel::builder().keys(doc! {"pub_date": -1}).build();
    Coll::<Question>::from_db(db)
        .create_index(question_index, None)
        .await?;

    // Choice collection: choices are always looked up through their question.
    let choice_index = IndexModel::builder()
        .keys(doc! {"question_id": 1, "_id": 1})
        .build();
    Coll::<Choice>::from_db(db)
        .create_index(choice_index, None)
        .await?;

    Ok(())
}
