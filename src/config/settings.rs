//! Process settings read from the environment.

use crate::error::SettingsError;
use std::path::PathBuf;

pub const DEFAULT_SCHEMA: &str = "api_creator";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9000";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Without a database url the gateway runs on in-memory stores.
    pub database_url: Option<String>,
    pub schema: String,
    pub bind_addr: String,
    pub body_limit: usize,
    pub max_connections: u32,
    pub definitions: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: None,
            schema: DEFAULT_SCHEMA.into(),
            bind_addr: DEFAULT_BIND_ADDR.into(),
            body_limit: DEFAULT_BODY_LIMIT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            definitions: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();
        Ok(Settings {
            database_url: get("DATABASE_URL"),
            schema: get("GATEWAY_SCHEMA").unwrap_or(defaults.schema),
            bind_addr: get("GATEWAY_BIND_ADDR").unwrap_or(defaults.bind_addr),
            body_limit: parse_number("GATEWAY_BODY_LIMIT", get("GATEWAY_BODY_LIMIT"), defaults.body_limit)?,
            max_connections: parse_number(
                "GATEWAY_MAX_CONNECTIONS",
                get("GATEWAY_MAX_CONNECTIONS"),
                defaults.max_connections,
            )?,
            definitions: get("GATEWAY_DEFINITIONS").map(PathBuf::from),
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    var: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, SettingsError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| SettingsError::Invalid { var, value: v }),
    }
}
