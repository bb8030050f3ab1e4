use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_signup_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    // First admin, created at startup when no admin exists
    pub seed_admin_email: String,
    pub seed_admin_name: String,
    pub seed_admin_password: Option<String>,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 1800)?, // 30 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_signup_per_min: or_default("RATE_SIGNUP_PER_MIN", 30)?,
            rate_refresh_per_min: or_default("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: or_default("API_PREFIX", "/api/v1".to_string())?,
            log_dir: or_default("LOG_DIR", "logs".to_string())?,

            seed_admin_email: or_default("SEED_ADMIN_EMAIL", "admin@dew.com".to_string())?,
            seed_admin_name: or_default("SEED_ADMIN_NAME", "Dew Admin".to_string())?,
            seed_admin_password: env::var("SEED_ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
        })
    }

    /// Configuration for tests and tools that never open a database.
    pub fn for_secret(jwt_secret: &str) -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: jwt_secret.to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 1800,
            refresh_token_ttl: 604_800,
            rate_login_per_min: 60,
            rate_signup_per_min: 30,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api/v1".to_string(),
            log_dir: "logs".to_string(),
            seed_admin_email: "admin@dew.com".to_string(),
            seed_admin_name: "Dew Admin".to_string(),
            seed_admin_password: None,
        }
    }
}
