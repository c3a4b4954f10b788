//! Service configuration.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use wordbank_core::DayBoundary;

/// Default number of tokens kept from one pasted text.
pub const DEFAULT_BULK_MAX_TOKENS: usize = 200;

/// Default number of words accepted by one bulk registration.
pub const DEFAULT_BULK_MAX_WORDS_PER_REQUEST: usize = 200;

/// Default number of words a user may hold active at once.
pub const DEFAULT_MAX_ACTIVE_WORDS_PER_USER: i64 = 2000;

/// Default daily bulk cap.
pub const DEFAULT_DAILY_BULK_CAP: u32 = 20;

/// Default daily quiz cap.
pub const DEFAULT_DAILY_QUIZ_CAP: u32 = 50;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Maximum pooled database connections.
    pub database_max_connections: u32,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Tokens kept from one bulk tokenize text.
    pub bulk_max_tokens: usize,

    /// Words accepted by one bulk register request.
    pub bulk_max_words_per_request: usize,

    /// Active registrations a user may hold.
    pub max_active_words_per_user: i64,

    /// Bulk tokenize/register calls allowed per day. `0` disables the feature.
    pub daily_bulk_cap: u32,

    /// Quiz calls allowed per day, enforced by [`AppState::count_quiz`]. `0` disables
    /// the feature.
    ///
    /// [`AppState::count_quiz`]: crate::state::AppState::count_quiz
    pub daily_quiz_cap: u32,

    /// Where one usage day ends and the next begins.
    pub day_boundary: DayBoundary,

    /// Requests per minute per `(ip, user-agent, route)`. `0` disables the limiter.
    pub rate_limit_per_minute: u32,

    /// Key rate limits by `x-forwarded-for` instead of the socket peer. Only safe behind
    /// a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

/// Database secrets file structure.
#[derive(Debug, Deserialize)]
struct DatabaseSecrets {
    url: String,
    #[serde(default)]
    max_connections: Option<u32>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (database_url, secret_max_connections) = load_database_secrets();

        let day_boundary = match std::env::var("DAY_BOUNDARY_OFFSET") {
            Ok(raw) => DayBoundary::parse(&raw).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "Invalid DAY_BOUNDARY_OFFSET, using default");
                defaults.day_boundary
            }),
            Err(_) => defaults.day_boundary,
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url,
            database_max_connections: env_or(
                "DATABASE_MAX_CONNECTIONS",
                secret_max_connections.unwrap_or(defaults.database_max_connections),
            ),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            bulk_max_tokens: env_or("BULK_MAX_TOKENS", defaults.bulk_max_tokens),
            bulk_max_words_per_request: env_or(
                "BULK_MAX_WORDS_PER_REQUEST",
                defaults.bulk_max_words_per_request,
            ),
            max_active_words_per_user: env_or(
                "MAX_ACTIVE_WORDS_PER_USER",
                defaults.max_active_words_per_user,
            ),
            daily_bulk_cap: env_or("DAILY_BULK_CAP", defaults.daily_bulk_cap),
            daily_quiz_cap: env_or("DAILY_QUIZ_CAP", defaults.daily_quiz_cap),
            day_boundary,
            rate_limit_per_minute: env_or("RATE_LIMIT_PER_MINUTE", defaults.rate_limit_per_minute),
            trust_forwarded_for: env_or("TRUST_FORWARDED_FOR", defaults.trust_forwarded_for),
        }
    }
}

/// Read `name` and parse it, keeping `default` when unset or invalid.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|err| {
            tracing::warn!(var = name, value = %raw, error = %err, "Invalid configuration value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Load the database URL from the environment or a secrets file.
fn load_database_secrets() -> (Option<String>, Option<u32>) {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return (Some(url), None);
    }

    let secret_paths = [
        ".secrets/database.json",
        "wordbank/.secrets/database.json",
        "../.secrets/database.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<DatabaseSecrets>(path) {
            tracing::info!(path = %path, "Loaded database secrets from file");
            return (Some(secrets.url), secrets.max_connections);
        }
    }

    tracing::debug!("No database configured");
    (None, None)
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            database_max_connections: 10,
            cors_origins: vec!["*".into()],
            max_body_bytes: 256 * 1024,
            request_timeout_seconds: 30,
            bulk_max_tokens: DEFAULT_BULK_MAX_TOKENS,
            bulk_max_words_per_request: DEFAULT_BULK_MAX_WORDS_PER_REQUEST,
            max_active_words_per_user: DEFAULT_MAX_ACTIVE_WORDS_PER_USER,
            daily_bulk_cap: DEFAULT_DAILY_BULK_CAP,
            daily_quiz_cap: DEFAULT_DAILY_QUIZ_CAP,
            day_boundary: DayBoundary::default(),
            rate_limit_per_minute: 60,
            trust_forwarded_for: false,
        }
    }
}
