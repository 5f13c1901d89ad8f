use std::path::PathBuf;

/// Origins always allowed by CORS. `CORS_ORIGINS` adds to these.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://localhost:8080",
    "http://localhost:8081",
];

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins: the defaults plus comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Directory holding cropped picture files (default: `pictures`).
    pub pictures_dir: PathBuf,
    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | (none beyond defaults)     |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `PICTURES_DIR`         | `pictures`                 |
    /// | `LOG_FORMAT`           | `text`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let extra_origins = std::env::var("CORS_ORIGINS").unwrap_or_default();
        let cors_origins = merge_origins(&extra_origins);

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let pictures_dir = std::env::var("PICTURES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pictures"));

        let json_logs = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            pictures_dir,
            json_logs,
        }
    }
}

/// Default origins followed by any extra comma-separated ones, deduplicated.
fn merge_origins(extra: &str) -> Vec<String> {
    let mut origins: Vec<String> = DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect();
    for origin in extra.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !origins.iter().any(|o| o == origin) {
            origins.push(origin.to_string());
        }
    }
    origins
}
