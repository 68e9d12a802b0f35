/// Configuration management for the API server
///
/// Configuration is loaded from environment variables (with `.env` support
/// for development) into a type-safe struct. The signing secret is injected
/// here and nowhere else; rotating it is a config change plus restart, and
/// it invalidates every outstanding session token.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: *)
/// - `JWT_SECRET`: token signing secret, at least 32 bytes (required)
/// - `JWT_AUDIENCE`: audience claim (default: https://api.helloduet.com)
/// - `JWT_TTL_HOURS`: session lifetime (default: 24)
/// - `AUTH_TIMEOUT_MS`: request-gate deadline (default: 500)
/// - `RUST_LOG`: log filter (default: info)

use duet_shared::auth::jwt::TokenConfig;
use std::env;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token signing configuration
    pub jwt: TokenConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` means permissive (development)
    pub cors_origins: Vec<String>,

    /// Deadline for the request gate's verify + resolve sequence
    pub auth_timeout_ms: u64,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value fails to
    /// parse, or the signing secret is too short.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let auth_timeout_ms = env::var("AUTH_TIMEOUT_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse::<u64>()?;

        let url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let audience = env::var("JWT_AUDIENCE")
            .unwrap_or_else(|_| "https://api.helloduet.com".to_string());

        let ttl_hours = env::var("JWT_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse::<i64>()?;

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                auth_timeout_ms,
            },
            database: DatabaseConfig {
                url,
                max_connections,
            },
            jwt: TokenConfig {
                secret,
                audience,
                ttl_hours,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Returns the request-gate deadline as a [`Duration`]
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.api.auth_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                auth_timeout_ms: 500,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/duet_test".to_string(),
                max_connections: 10,
            },
            jwt: TokenConfig {
                secret: "test-signing-secret-at-least-32-bytes-long".to_string(),
                audience: "https://api.helloduet.com".to_string(),
                ttl_hours: 24,
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_auth_timeout() {
        assert_eq!(test_config().auth_timeout(), Duration::from_millis(500));
    }
}
