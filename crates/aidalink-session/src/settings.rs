//! Where connection parameters come from.

use aidalink_transport::Endpoint;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Host used when nothing else is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Port the robot controller listens on by default.
pub const DEFAULT_PORT: u16 = 6662;

/// Environment variable naming the robot host.
pub const HOST_ENV: &str = "AIDA_HOST";
/// Environment variable naming the robot port.
pub const PORT_ENV: &str = "AIDA_PORT";

/// Robot address every channel connects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }
}

/// Supplies the `(host, port)` pair used at bring-up.
pub trait SettingsSource {
    fn settings(&self) -> Result<Settings>;
}

impl SettingsSource for Settings {
    fn settings(&self) -> Result<Settings> {
        Ok(self.clone())
    }
}

/// Reads `AIDA_HOST` / `AIDA_PORT`, falling back to [`Settings::default`]
/// for whichever is unset or empty.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    fallback: Settings,
}

impl EnvSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different fallback when a variable is unset.
    pub fn with_fallback(fallback: Settings) -> Self {
        Self { fallback }
    }

    fn resolve(&self, host: Option<String>, port: Option<String>) -> Result<Settings> {
        let host = host
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.fallback.host.clone());
        let port = match port.filter(|value| !value.trim().is_empty()) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|err| {
                SessionError::Settings(format!("invalid {PORT_ENV} '{raw}': {err}"))
            })?,
            None => self.fallback.port,
        };
        Ok(Settings { host, port })
    }
}

impl SettingsSource for EnvSettings {
    fn settings(&self) -> Result<Settings> {
        self.resolve(std::env::var(HOST_ENV).ok(), std::env::var(PORT_ENV).ok())
    }
}
