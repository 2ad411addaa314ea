use crate::auth::jwt::JwtConfig;

/// Default cap on concurrent sessions per identity.
const DEFAULT_MAX_SESSIONS_PER_USER: usize = 5;

/// Default period of the expired-session purge, in seconds.
const DEFAULT_SESSION_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Server configuration loaded from environment variables.
///
/// Everything except the two secrets has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Session token signing and lifetime.
    pub jwt: JwtConfig,
    /// Session bookkeeping knobs.
    pub sessions: SessionConfig,
    /// Secret keying the device-to-identity derivation.
    pub anon_hmac_key: String,
    /// Bearer secret for `/admin` routes. `None` disables them.
    pub admin_token: Option<String>,
    /// PostgreSQL URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
}

/// Per-identity session limits and the cleanup cadence.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum concurrent sessions per identity; `0` disables the cap.
    pub max_per_user: usize,
    /// Seconds between expired-session purges.
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_per_user: DEFAULT_MAX_SESSIONS_PER_USER,
            cleanup_interval_secs: DEFAULT_SESSION_CLEANUP_INTERVAL_SECS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `HOST`                          | `0.0.0.0`               |
    /// | `PORT`                          | `3000`                  |
    /// | `CORS_ORIGINS`                  | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`          | `30`                    |
    /// | `MAX_SESSIONS_PER_USER`         | `5`                     |
    /// | `SESSION_CLEANUP_INTERVAL_SECS` | `300`                   |
    /// | `ANON_HMAC_KEY`                 | required                |
    /// | `ADMIN_TOKEN`                   | unset                   |
    /// | `DATABASE_URL`                  | unset                   |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values and on a missing `ANON_HMAC_KEY` or
    /// `JWT_SECRET`; there is no useful way to run without them.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_per_user: usize = std::env::var("MAX_SESSIONS_PER_USER")
            .unwrap_or_else(|_| DEFAULT_MAX_SESSIONS_PER_USER.to_string())
            .parse()
            .expect("MAX_SESSIONS_PER_USER must be a non-negative integer");

        let cleanup_interval_secs: u64 = std::env::var("SESSION_CLEANUP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SESSION_CLEANUP_INTERVAL_SECS.to_string())
            .parse()
            .expect("SESSION_CLEANUP_INTERVAL_SECS must be a valid u64");
        assert!(
            cleanup_interval_secs > 0,
            "SESSION_CLEANUP_INTERVAL_SECS must be positive"
        );

        let anon_hmac_key =
            std::env::var("ANON_HMAC_KEY").expect("ANON_HMAC_KEY must be set in the environment");
        assert!(!anon_hmac_key.is_empty(), "ANON_HMAC_KEY must not be empty");

        let admin_token = non_empty_var("ADMIN_TOKEN");
        let database_url = non_empty_var("DATABASE_URL");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            sessions: SessionConfig {
                max_per_user,
                cleanup_interval_secs,
            },
            anon_hmac_key,
            admin_token,
            database_url,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
