//! MongoDB client setup

use std::time::Duration;

use mongodb::{bson::doc, options::ClientOptions, Client, Database};
use tracing::info;

use crate::domain::RepositoryError;

/// MongoDB connection configuration
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`
    pub url: String,
    /// Database holding the `users` collection
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: "user_accounts".to_string(),
        }
    }
}

impl MongoConfig {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
        }
    }
}

/// Connect to MongoDB and verify the server answers a ping
pub async fn connect_mongo(config: &MongoConfig) -> Result<Database, RepositoryError> {
    let mut options = ClientOptions::parse(&config.url)
        .await
        .map_err(|e| RepositoryError::server(format!("Invalid MongoDB URL: {}", e)))?;

    options.connect_timeout = Some(Duration::from_secs(10));
    options.server_selection_timeout = Some(Duration::from_secs(30));

    let client = Client::with_options(options)
        .map_err(|e| RepositoryError::server(format!("Failed to connect to MongoDB: {}", e)))?;

    let db = client.database(&config.database);

    db.run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| RepositoryError::server(format!("MongoDB ping failed: {}", e)))?;

    info!(database = %config.database, "Connected to MongoDB");

    Ok(db)
}
