// src/config/mod.rs

use once_cell::sync::Lazy;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DbWorkerConfig {
    // ── Backend endpoint
    pub host: String,
    pub port: u16,

    // ── Import settings
    /// Declared maximum import size in megabytes. The backend contract states
    /// the limit but nothing in this client checks it; a call site that wants
    /// client-side enforcement reads it from here before uploading.
    pub import_max_file_size_mb: u64,

    // ── HTTP client
    pub request_timeout: u64,

    // ── Logging
    pub log_level: String,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            // Trim whitespace and strip trailing comments before parsing
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl DbWorkerConfig {
    pub fn from_env() -> Self {
        // A missing .env file is fine; plain environment variables still apply.
        let _ = dotenvy::dotenv();

        Self {
            host: env_var_or("DBWORKER_HOST", "http://localhost".to_string()),
            port: env_var_or("DBWORKER_PORT", 5000),
            import_max_file_size_mb: env_var_or("DBWORKER_IMPORT_MAX_FILE_SIZE", 500),
            request_timeout: env_var_or("DBWORKER_REQUEST_TIMEOUT", 120),
            log_level: env_var_or("DBWORKER_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Base URL of the backend, `{host}:{port}`.
    pub fn full_host(&self) -> String {
        format!("{}:{}", self.host.trim_end_matches('/'), self.port)
    }

    /// Full URL for a backend endpoint path.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.full_host(), path.trim_start_matches('/'))
    }

    /// Per-request timeout for gateway calls.
    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<DbWorkerConfig> = Lazy::new(DbWorkerConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DbWorkerConfig::from_env();

        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 5000);
        assert_eq!(config.import_max_file_size_mb, 500);
    }

    #[test]
    fn test_url_helpers() {
        let config = DbWorkerConfig::from_env();

        assert_eq!(config.full_host(), "http://localhost:5000");
        assert_eq!(
            config.endpoint_url("/import/preview"),
            "http://localhost:5000/import/preview"
        );
        assert_eq!(config.request_timeout_duration(), Duration::from_secs(120));
    }
}
