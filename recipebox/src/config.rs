use anyhow::{Context, Result, bail};
use std::env;
use std::str::FromStr;

use crate::models::user::TOKEN_REUSE_MARGIN_SECS;

/// Upper bound on `TOKEN_TTL_SECS`: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Runtime settings, read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL, or `memory:` for the in-process store.
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    /// Lifetime of a freshly issued bearer token.
    pub token_ttl_secs: i64,
    /// `/login` attempts a single IP can burst before being throttled.
    pub login_burst: u32,
    /// Seconds it takes to earn back one `/login` attempt.
    pub login_period_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "memory:".to_string(),
            port: 3000,
            max_connections: 10,
            token_ttl_secs: 86400,
            login_burst: 5,
            login_period_secs: 180,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_var("PORT", defaults.port)?,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            token_ttl_secs: parse_var("TOKEN_TTL_SECS", defaults.token_ttl_secs)?,
            login_burst: parse_var("LOGIN_BURST", defaults.login_burst)?,
            login_period_secs: parse_var("LOGIN_PERIOD_SECS", defaults.login_period_secs)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would leave the server up but unusable.
    pub fn validate(&self) -> Result<()> {
        // A token must outlive the reuse margin, or every login hands back one that is
        // already due for replacement.
        if self.token_ttl_secs <= TOKEN_REUSE_MARGIN_SECS {
            bail!(
                "TOKEN_TTL_SECS must be greater than {TOKEN_REUSE_MARGIN_SECS}, got {}",
                self.token_ttl_secs
            );
        }
        if self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            bail!(
                "TOKEN_TTL_SECS must be at most {MAX_TOKEN_TTL_SECS}, got {}",
                self.token_ttl_secs
            );
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
