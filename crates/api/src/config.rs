//! Application configuration loaded from environment variables.

use std::time::Duration;

use common::UserId;
use saga::SagaConfig;

const DEFAULT_STEP_TIMEOUT_MS: u64 = 5000;
const DEFAULT_DEMO_USER: &str = "demo-user";

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL ledger storage; in-memory when unset
/// - `ASSIGNMENT_SERVICE_URL`, `ATTEMPT_SERVICE_URL`: remote services for the
///   sagas; the in-process services are used when unset
/// - `SAGA_STEP_TIMEOUT_MS`: deadline per saga step (default: `5000`)
/// - `DEMO_USER_ID`: user that starts attempts (default: `"demo-user"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub assignment_service_url: Option<String>,
    pub attempt_service_url: Option<String>,
    pub saga_step_timeout: Duration,
    pub demo_user_id: String,
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: non_empty_var("DATABASE_URL"),
            assignment_service_url: non_empty_var("ASSIGNMENT_SERVICE_URL"),
            attempt_service_url: non_empty_var("ATTEMPT_SERVICE_URL"),
            saga_step_timeout: Duration::from_millis(
                std::env::var("SAGA_STEP_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_STEP_TIMEOUT_MS),
            ),
            demo_user_id: non_empty_var("DEMO_USER_ID")
                .unwrap_or_else(|| DEFAULT_DEMO_USER.to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn saga_config(&self) -> SagaConfig {
        SagaConfig {
            user_id: UserId::new(self.demo_user_id.clone()),
            step_timeout: self.saga_step_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            assignment_service_url: None,
            attempt_service_url: None,
            saga_step_timeout: Duration::from_millis(DEFAULT_STEP_TIMEOUT_MS),
            demo_user_id: DEFAULT_DEMO_USER.to_string(),
        }
    }
}
