//! Server configuration parsed from environment variables.
//!
//! `.env` is loaded by `main` before this runs, so everything here reads the
//! process environment only.

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_INVITE_TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// Page size used when a list request omits `per_page`.
    pub default_page_size: u32,
    /// Random bytes per invite token (hex-encoded, so the token is twice as long).
    pub invite_token_bytes: usize,
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `BIND_ADDR`: default `0.0.0.0`
    /// - `PORT`: default 5000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `DEFAULT_PAGE_SIZE`: default 20, capped at the list maximum
    /// - `INVITE_TOKEN_BYTES`: default 32
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is unset or a numeric value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        let default_page_size = parse_or(&lookup, "DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let invite_token_bytes = parse_or(&lookup, "INVITE_TOKEN_BYTES", DEFAULT_INVITE_TOKEN_BYTES)?;

        if db_max_connections == 0 {
            return Err(ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", value: "0".into() });
        }
        if default_page_size == 0 {
            return Err(ConfigError::Invalid { key: "DEFAULT_PAGE_SIZE", value: "0".into() });
        }
        if invite_token_bytes < 16 {
            return Err(ConfigError::Invalid { key: "INVITE_TOKEN_BYTES", value: invite_token_bytes.to_string() });
        }

        Ok(Self {
            database_url,
            bind_addr,
            port,
            db_max_connections,
            default_page_size: default_page_size.min(crate::services::listing::MAX_PER_PAGE),
            invite_token_bytes,
        })
    }

    /// Socket address string handed to the TCP listener.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
