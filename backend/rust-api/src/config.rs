use serde::Deserialize;
use std::env;

const DEV_JWT_SECRET: &str = "dev-secret-only-for-local-testing";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    /// Topic cache is disabled when unset.
    pub redis_uri: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    /// Upper bound of attempts read for one statistics view.
    pub stats_history_limit: usize,
    pub topic_cache_ttl_secs: u64,
    /// Basic auth credentials of `/metrics`, as `user:password`.
    pub metrics_auth: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "lingua".to_string(),
            redis_uri: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            bind_addr: "0.0.0.0:8081".to_string(),
            stats_history_limit: 10_000,
            topic_cache_ttl_secs: 300,
            metrics_auth: "admin:changeme".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml, overridden by APP__SECTION__KEY variables
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or(defaults.mongo_uri);

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or(defaults.mongo_database);

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .ok()
            .filter(|uri| !uri.trim().is_empty());

        let jwt_secret = match settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
        {
            Ok(secret) => secret,
            Err(_) if app_env == "prod" => {
                return Err(config::ConfigError::NotFound(
                    "auth.jwt_secret (JWT_SECRET must be set in production)".to_string(),
                ));
            }
            Err(_) => {
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                defaults.jwt_secret
            }
        };

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        let stats_history_limit = settings
            .get_int("statistics.history_limit")
            .ok()
            .and_then(|limit| usize::try_from(limit).ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(defaults.stats_history_limit);

        let topic_cache_ttl_secs = settings
            .get_int("redis.topic_cache_ttl_secs")
            .ok()
            .and_then(|ttl| u64::try_from(ttl).ok())
            .unwrap_or(defaults.topic_cache_ttl_secs);

        let metrics_auth = settings
            .get_string("metrics.auth")
            .or_else(|_| env::var("METRICS_AUTH"))
            .unwrap_or(defaults.metrics_auth);

        Ok(Config {
            mongo_uri,
            mongo_database,
            redis_uri,
            jwt_secret,
            bind_addr,
            stats_history_limit,
            topic_cache_ttl_secs,
            metrics_auth,
        })
    }
}
