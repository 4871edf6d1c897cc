use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

// Connection strings shipped in the project templates. Treated as "not configured".
const PLACEHOLDER_DATABASE_URLS: [&str; 3] = [
    "username:password",
    "postgres:password",
    "localhost:5432/brutalist_portfolio",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_api_key: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub cache_max_size: usize,
    pub metrics_retention: Duration,
    pub metrics_buffer_limit: usize,
    pub health_check_interval: Duration,
    pub purge_interval: Duration,
    pub environment: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_api_key: String::new(),
            max_connections: 10,
            min_connections: 0,
            connection_timeout: Duration::from_millis(30_000),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1_000),
            cache_max_size: 1_000,
            metrics_retention: Duration::from_secs(3_600),
            metrics_buffer_limit: 10_000,
            health_check_interval: Duration::from_secs(60),
            purge_interval: Duration::from_secs(300),
            environment: "development".to_string(),
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, database features will be disabled");
                    String::new()
                }),
            database_api_key: env::var("DATABASE_ANON_KEY")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_ANON_KEY not set, using empty value");
                    String::new()
                }),
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: parse_or("DATABASE_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout: millis_or("DATABASE_CONNECTION_TIMEOUT", defaults.connection_timeout),
            max_retries: parse_or("DATABASE_MAX_RETRIES", defaults.max_retries),
            retry_base_delay: millis_or("DATABASE_RETRY_BASE_DELAY", defaults.retry_base_delay),
            cache_max_size: parse_or("CACHE_MAX_SIZE", defaults.cache_max_size),
            metrics_retention: millis_or("METRICS_RETENTION", defaults.metrics_retention),
            metrics_buffer_limit: parse_or("METRICS_BUFFER_LIMIT", defaults.metrics_buffer_limit),
            health_check_interval: millis_or("HEALTH_CHECK_INTERVAL", defaults.health_check_interval),
            purge_interval: millis_or("METRICS_PURGE_INTERVAL", defaults.purge_interval),
            environment: env::var("APP_ENV").unwrap_or(defaults.environment),
            port: parse_or("PORT", defaults.port),
        };

        if !config.is_database_configured() {
            warn!("DATABASE_URL not properly configured - database features will be disabled");
        }

        config
    }

    pub fn is_database_configured(&self) -> bool {
        !self.database_url.is_empty()
            && !PLACEHOLDER_DATABASE_URLS
                .iter()
                .any(|placeholder| self.database_url.contains(placeholder))
    }

    /// Long-running server processes own the background housekeeping tasks.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn millis_or(key: &str, default: Duration) -> Duration {
    Duration::from_millis(parse_or(key, default.as_millis() as u64))
}
