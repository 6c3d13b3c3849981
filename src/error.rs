use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] describing the missing thing.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        Err(match self {
            Self::Db(err) => {
                error!("Database error: {err}");
                Status::InternalServerError
            }
            Self::NotFound(what) => {
                debug!("Not found: {what}");
                Status::NotFound
            }
        })
    }
}
