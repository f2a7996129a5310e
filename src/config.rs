use anyhow::Context;

use crate::jwt::JwtConfig;

/// Password reset behaviour.
#[derive(Debug, Clone)]
pub struct PasswordResetConfig {
    pub ttl_minutes: i64,
    /// Echo the reset token in the forgot-password response. There is no mail delivery, so
    /// this is how the token reaches the user.
    pub expose_token: bool,
}

impl Default for PasswordResetConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 60,
            expose_token: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub password_reset: PasswordResetConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let port = parse_var("APP_PORT", 8000u16)?;
        let jwt = JwtConfig::from_env()?;

        let defaults = PasswordResetConfig::default();
        let password_reset = PasswordResetConfig {
            ttl_minutes: parse_var("RESET_TOKEN_TTL_MINUTES", defaults.ttl_minutes)?,
            expose_token: parse_var("RESET_TOKEN_IN_RESPONSE", defaults.expose_token)?,
        };

        Ok(Self {
            database_url,
            port,
            jwt,
            password_reset,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
