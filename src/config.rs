/*
 * Responsibility
 * - Read settings from the environment (.env is honoured via dotenvy)
 * - Rate limit window/quota, CORS origin policy, snapshot path, listen port
 * - Reject malformed values at startup instead of silently falling back
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;

use crate::middleware::cors::OriginPolicy;
use crate::middleware::rate_limit::RateLimitConfig;

const DEFAULT_DATA_PATH: &str = "data/library.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<&str>) -> Self {
        match raw.unwrap_or("development").to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub rate_limit: RateLimitConfig,
    pub cors_origin: OriginPolicy,
    pub data_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let window_ms: u64 = parse_or(&lookup, "RATE_LIMIT_WINDOW_MS", 60_000)?;
        let max_requests: u64 = parse_or(&lookup, "RATE_LIMIT_MAX_REQUESTS", 100)?;
        let skip_successful_requests = match lookup("RATE_LIMIT_SKIP_SUCCESSFUL") {
            None => false,
            Some(v) => parse_flag(&v).ok_or(ConfigError::Invalid("RATE_LIMIT_SKIP_SUCCESSFUL"))?,
        };

        let rate_limit = RateLimitConfig {
            window: Duration::from_millis(window_ms),
            max_requests,
            skip_successful_requests,
            ..RateLimitConfig::default()
        };

        let cors_origin = parse_origin_policy(lookup("CORS_ORIGIN").as_deref())?;

        let data_path = lookup("DATA_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        Ok(Self {
            addr,
            app_env,
            rate_limit,
            cors_origin,
            data_path,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::Invalid(key))
        }
        _ => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// `CORS_ORIGIN` forms:
/// - unset / empty: allow every origin
/// - `regex:<pattern>`: origin must match the pattern
/// - `a,b,c`: origin must be one of the listed values
/// - anything else: exact match
fn parse_origin_policy(raw: Option<&str>) -> Result<OriginPolicy, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(OriginPolicy::Any);
    };

    if let Some(pattern) = raw.strip_prefix("regex:") {
        let re = Regex::new(pattern).map_err(|_| ConfigError::Invalid("CORS_ORIGIN"))?;
        return Ok(OriginPolicy::Pattern(re));
    }

    if raw.contains(',') {
        let allowed: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if allowed.is_empty() {
            return Err(ConfigError::Missing("CORS_ORIGIN"));
        }
        return Ok(OriginPolicy::predicate(move |origin| {
            allowed.iter().any(|a| a == origin)
        }));
    }

    Ok(OriginPolicy::Exact(raw.to_string()))
}
