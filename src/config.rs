use anyhow::Context;
use serde::Deserialize;

/// Secrets and lifetimes for the two token kinds.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub access_ttl_seconds: i64,
    pub refresh_secret: String,
    pub refresh_ttl_seconds: i64,
}

/// Cookie names and scoping. Paths are absolute request paths.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub access_name: String,
    pub refresh_name: String,
    pub access_path: String,
    pub refresh_path: String,
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub api_prefix: String,
    pub jwt: JwtConfig,
    pub cookies: CookieConfig,
}

pub const REFRESH_ROUTE: &str = "/auth/refresh-access-token";

/// Upper bound on either token lifetime (ten years).
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// The prefix is a router nest point: absolute and not the root.
fn check_api_prefix(prefix: &str) -> anyhow::Result<()> {
    if !prefix.starts_with('/') || prefix == "/" || prefix.ends_with('/') {
        anyhow::bail!("API_PREFIX must look like /api, got {prefix:?}");
    }
    Ok(())
}

fn ttl_from_env(key: &str, default: i64) -> anyhow::Result<i64> {
    let ttl = env_or(key, default);
    if !(1..=MAX_TTL_SECONDS).contains(&ttl) {
        anyhow::bail!("{key} must be between 1 and {MAX_TTL_SECONDS} seconds, got {ttl}");
    }
    Ok(ttl)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let api_prefix = std::env::var("API_PREFIX").unwrap_or_else(|_| "/api".into());
        check_api_prefix(&api_prefix)?;

        let jwt = JwtConfig {
            access_secret: std::env::var("JWT_ACCESS_SECRET").context("JWT_ACCESS_SECRET")?,
            access_ttl_seconds: ttl_from_env("JWT_ACCESS_TTL_SECONDS", 15 * 60)?,
            refresh_secret: std::env::var("JWT_REFRESH_SECRET").context("JWT_REFRESH_SECRET")?,
            refresh_ttl_seconds: ttl_from_env("JWT_REFRESH_TTL_SECONDS", 60 * 60 * 24 * 14)?,
        };
        if jwt.access_secret == jwt.refresh_secret {
            anyhow::bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }

        let cookies = CookieConfig {
            access_name: std::env::var("ACCESS_COOKIE_NAME")
                .unwrap_or_else(|_| "access_token".into()),
            refresh_name: std::env::var("REFRESH_COOKIE_NAME")
                .unwrap_or_else(|_| "refresh_token".into()),
            access_path: api_prefix.clone(),
            refresh_path: format!("{}{}", api_prefix, REFRESH_ROUTE),
            secure: env_or("COOKIE_SECURE", false),
        };

        Ok(Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            api_prefix,
            jwt,
            cookies,
        })
    }

    /// Configuration with fixed secrets and no database, for tests and local runs.
    pub fn local(access_secret: &str, refresh_secret: &str) -> Self {
        let api_prefix = "/api".to_string();
        Self {
            database_url: None,
            db_max_connections: 1,
            jwt: JwtConfig {
                access_secret: access_secret.into(),
                access_ttl_seconds: 15 * 60,
                refresh_secret: refresh_secret.into(),
                refresh_ttl_seconds: 60 * 60 * 24 * 14,
            },
            cookies: CookieConfig {
                access_name: "access_token".into(),
                refresh_name: "refresh_token".into(),
                access_path: api_prefix.clone(),
                refresh_path: format!("{}{}", api_prefix, REFRESH_ROUTE),
                secure: false,
            },
            api_prefix,
        }
    }
}
