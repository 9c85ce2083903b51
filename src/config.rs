use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

#[derive(Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_dir: String,
    /// Calendar export folder used when settings name none
    pub ics_default_dir: PathBuf,
    pub scheduler_tick_secs: u64,
    pub smtp: Option<SmtpConfig>,
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
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn smtp_from_env() -> Result<Option<SmtpConfig>> {
    let Ok(server) = env::var("SMTP_SERVER") else {
        return Ok(None);
    };
    if server.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(SmtpConfig {
        server,
        port: or_default("SMTP_PORT", 587)?,
        username: required("SMTP_USERNAME")?,
        password: required("SMTP_PASSWORD")?,
        from_email: required("SMTP_FROM_EMAIL")?,
    }))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: or_default("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            ics_default_dir: env::var("ICS_DEFAULT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public/files")),
            scheduler_tick_secs: or_default("SCHEDULER_TICK_SECS", 3600)?,
            smtp: smtp_from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_values_use_defaults() {
        let v: u32 = or_default("HR_ADDON_TEST_SURELY_UNSET", 42).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn missing_required_value_names_the_key() {
        let err = required("HR_ADDON_TEST_SURELY_UNSET_TOO").unwrap_err();
        assert_eq!(err.to_string(), "HR_ADDON_TEST_SURELY_UNSET_TOO must be set");
    }
}
