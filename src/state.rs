use std::sync::Arc;

use anyhow::Context;
use bson::doc;
use mongodb::Client;
use tracing::{info, warn};

use crate::auth::repo::{MongoUsers, UserStore};
use crate::config::AppConfig;
use crate::movies::repo::{MongoMovies, MovieStore};
use crate::worker::Deadlines;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub movies: Arc<dyn MovieStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        info!("connecting to MongoDB");
        let client = Client::with_uri_str(&config.mongodb_uri)
            .await
            .context("connect to MongoDB")?;
        let db = client.database(&config.database_name);
        db.run_command(doc! { "ping": 1 }, None)
            .await
            .context("ping MongoDB")?;
        info!(database = %config.database_name, "connected to MongoDB");

        let users = MongoUsers::new(&db);
        let movies = MongoMovies::new(&db);

        // Existing duplicate data blocks index builds; serve anyway.
        if let Err(e) = users.ensure_indexes().await {
            warn!(error = %e, "could not create User indexes; continuing");
        }
        if let Err(e) = movies.ensure_indexes().await {
            warn!(error = %e, "could not create Movie indexes; continuing");
        }

        Ok(Self::from_parts(config, Arc::new(users), Arc::new(movies)))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        movies: Arc<dyn MovieStore>,
    ) -> Self {
        Self {
            config,
            users,
            movies,
        }
    }

    pub fn write_deadlines(&self) -> Deadlines {
        Deadlines::write(&self.config.worker)
    }

    pub fn query_deadlines(&self) -> Deadlines {
        Deadlines::query(&self.config.worker)
    }
}

#[cfg(test)]
pub fn test_config() -> AppConfig {
    AppConfig {
        mongodb_uri: "mongodb://localhost:27017".into(),
        database_name: "magicstream_test".into(),
        frontend_url: None,
        host: "127.0.0.1".into(),
        port: 0,
        jwt: crate::config::JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        },
        worker: crate::config::WorkerConfig::default(),
    }
}

#[cfg(test)]
impl AppState {
    pub fn fake() -> Self {
        Self::fake_with(
            Arc::new(crate::fakes::MemoryUsers::default()),
            Arc::new(crate::fakes::MemoryMovies::default()),
        )
    }

    pub fn fake_with(users: Arc<dyn UserStore>, movies: Arc<dyn MovieStore>) -> Self {
        Self::from_parts(Arc::new(test_config()), users, movies)
    }
}
