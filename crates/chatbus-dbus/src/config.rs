use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable selecting the bus to connect to.
pub const BUS_ENV: &str = "CHATBUS_BUS";
/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV: &str = "CHATBUS_LOG";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid CHATBUS_BUS value '{0}': expected 'session' or 'system'")]
    InvalidBus(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusKind {
    #[default]
    Session,
    System,
}

impl fmt::Display for BusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusKind::Session => f.write_str("session"),
            BusKind::System => f.write_str("system"),
        }
    }
}

impl FromStr for BusKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" | "user" => Ok(BusKind::Session),
            "system" => Ok(BusKind::System),
            _ => Err(ConfigError::InvalidBus(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bus: BusKind,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Unset or empty
    /// variables fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bus = match lookup(BUS_ENV) {
            Some(v) if !v.trim().is_empty() => v.parse()?,
            _ => BusKind::default(),
        };
        Ok(Self { bus })
    }
}
