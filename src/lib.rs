#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use mongodb::{error::Error as DbError, Client};
use rocket::{Build, Rocket};

use crate::config::DatabaseFairing;
use crate::logging::LoggerFairing;
use crate::model::mongodb::ensure_indexes_exist;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

/// Build a server that connects to the database given by its configuration.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(DatabaseFairing)
        .mount("/", api::routes())
}

/// Build a server around an existing database connection, bypassing the
/// database configuration.
pub async fn rocket_for_db(client: Client, db_name: &str) -> Result<Rocket<Build>, DbError> {
    let db = client.database(db_name);
    ensure_indexes_exist(&db).await?;

    Ok(rocket::build()
        .attach(LoggerFairing)
        .mount("/", api::routes())
        .manage(client)
        .manage(db))
}

/// Connect to the database configured for tests.
#[cfg(test)]
async fn db_client() -> Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    Client::with_uri_str(&db_uri)
        .await
        .unwrap_or_else(|e| panic!("Could not connect to database with `db_uri` \"{db_uri}\": {e}"))
}

/// A fresh database name, so that concurrently running tests never collide.
#[cfg(test)]
fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}
