use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Deadlines handed to the bounded worker executor, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// How long a handler waits before answering 408.
    pub request_timeout_secs: u64,
    /// Cap on a single store write or unfiltered read.
    pub store_timeout_secs: u64,
    /// Cap on filtered, limited queries.
    pub query_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            store_timeout_secs: 100,
            query_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub mongodb_uri: String,
    pub database_name: String,
    pub frontend_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub worker: WorkerConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mongodb_uri =
            std::env::var("MONGODB_URI").context("MONGODB_URI environment variable not found")?;
        let database_name = std::env::var("DATABASE_NAME")
            .context("DATABASE_NAME environment variable not found")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .context("JWT_SECRET environment variable not found")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "magicstream".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "magicstream-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60 * 24),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 7),
        };
        let defaults = WorkerConfig::default();
        let worker = WorkerConfig {
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
            store_timeout_secs: env_parse("STORE_TIMEOUT_SECS")
                .unwrap_or(defaults.store_timeout_secs),
            query_timeout_secs: env_parse("QUERY_TIMEOUT_SECS")
                .unwrap_or(defaults.query_timeout_secs),
        };
        let port = env_parse("APP_PORT")
            .or_else(|| env_parse("PORT"))
            .unwrap_or(8080);

        Ok(Self {
            mongodb_uri,
            database_name,
            frontend_url: std::env::var("FRONTEND_URL").ok().filter(|v| !v.is_empty()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            jwt,
            worker,
        })
    }

    /// Origins allowed by CORS: the local frontend plus `FRONTEND_URL` when set.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec!["http://localhost:3000".to_string()];
        if let Some(url) = &self.frontend_url {
            origins.push(url.clone());
        }
        origins
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
