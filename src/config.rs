use std::{env, fmt, str::FromStr, time::Duration};

use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "https://fameduconnect.xyz",
    "https://www.fameduconnect.xyz",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
    Other(String),
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "development" => Environment::Development,
            "production" => Environment::Production,
            "test" => Environment::Test,
            other => Environment::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
            Environment::Other(s) => s,
        }
    }

    /// Internal error details are only sent to clients in development.
    pub fn exposes_error_details(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub firebase_project_id: Option<String>,
    pub firebase_api_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub body_limit_bytes: usize,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. `load` passes the process environment;
    /// tests pass a closure over a fixed table.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Self {
            port: try_load(&lookup, "PORT", DEFAULT_PORT),
            environment: Environment::parse(
                lookup("NODE_ENV").as_deref().unwrap_or("development"),
            ),
            firebase_project_id: lookup("FIREBASE_PROJECT_ID"),
            firebase_api_key: lookup("FIREBASE_API_KEY"),
            cors_origins,
            rate_limit_max: try_load_nonzero(&lookup, "RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX),
            rate_limit_window: Duration::from_secs(try_load_nonzero(
                &lookup,
                "RATE_LIMIT_WINDOW_SECS",
                DEFAULT_RATE_LIMIT_WINDOW_SECS,
            )),
            body_limit_bytes: try_load(&lookup, "BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT_BYTES),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
            default
        }),
    }
}

/// Zero would either disable the limiter (window) or reject everything (max).
fn try_load_nonzero<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + fmt::Display + Default + PartialEq + Copy,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let value = try_load(lookup, key, default);
    if value == T::default() {
        warn!("{key} must be greater than zero, using default: {default}");
        return default;
    }
    value
}
