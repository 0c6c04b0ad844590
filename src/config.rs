use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// Default configuration constants
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_API_BASE_URL: &str = "";
pub const DEFAULT_API_TOKEN: &str = "";
pub const DEFAULT_MOCK_LATENCY_MS: u64 = 1500;
pub const DEFAULT_MOCK_FAIL_EVERY: u64 = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not parse
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

pub fn load_env_file(env_file: Option<&str>) {
    if let Some(path) = env_file {
        dotenvy::from_path(Path::new(path)).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}

/// Provisioning API base URL; empty means the simulated backend is used.
pub fn get_api_base_url() -> String {
    sanitize_base_url(&env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()))
}

pub fn get_api_token() -> String {
    env::var("API_TOKEN").unwrap_or_else(|_| DEFAULT_API_TOKEN.to_string())
}

pub fn get_host() -> String {
    env::var("HOST")
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

pub fn get_port() -> Result<u16, ConfigError> {
    parse_var("PORT", "a port number", DEFAULT_PORT)
}

pub fn get_mock_latency() -> Result<Duration, ConfigError> {
    parse_var("MOCK_LATENCY_MS", "a number of milliseconds", DEFAULT_MOCK_LATENCY_MS).map(Duration::from_millis)
}

pub fn get_mock_fail_every() -> Result<u64, ConfigError> {
    parse_var("MOCK_FAIL_EVERY", "a non-negative integer", DEFAULT_MOCK_FAIL_EVERY)
}

fn parse_var<T: std::str::FromStr>(name: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value: raw,
        }),
        _ => Ok(default),
    }
}

/// Trim whitespace and trailing slashes; an empty URL stays empty.
pub fn sanitize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
