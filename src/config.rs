use log::{error, info};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;

/// Configuration for the database, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables.
#[derive(Debug, Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
}

fn default_db_name() -> String {
    "polls".to_string()
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the indexes exist, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting to '{}'...", config.db_name);

        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        // Ensure the required indexes exist. This is also our first round trip,
        // so it doubles as a connectivity check.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to set up database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::*;

    #[test]
    fn db_name_defaults_to_polls() {
        let figment =
            Figment::new().merge(Serialized::default("db_uri", "mongodb://localhost:27017"));
        let config = figment.extract::<DbConfig>().unwrap();
        assert_eq!(config.db_uri, "mongodb://localhost:27017");
        assert_eq!(config.db_name, "polls");
    }

    #[test]
    fn db_uri_is_required() {
        let figment = Figment::new().merge(Serialized::default("db_name", "elsewhere"));
        assert!(figment.extract::<DbConfig>().is_err());
    }
}
