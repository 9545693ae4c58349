//! Fleet configuration: which consoles to visit and how.
//!
//! The device list, console paths and timeouts come from a TOML file.
//! Credentials never do; they are read from the environment by the caller
//! and passed alongside.

use std::path::Path;

use remoteui_api::{ConsolePaths, Credentials, Timeouts};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const USER_ENV: &str = "PRINTCOUNT_USER";
pub const PASS_ENV: &str = "PRINTCOUNT_PASS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
    #[error("environment variable {0} is not set")]
    MissingCredential(&'static str),
}

/// One device of the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceEntry {
    /// Console base URL, e.g. `http://10.100.1.15:8000`.
    pub base: String,
    /// Site label written into every reading of this device.
    pub place: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetConfig {
    #[serde(default)]
    pub console: ConsolePaths,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

impl FleetConfig {
    /// Parses and validates a configuration document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::Invalid("no devices configured".into()));
        }
        if self.timeouts.action_ms == 0 || self.timeouts.nav_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        let paths = [
            ("login_path", &self.console.login_path),
            ("top_path", &self.console.top_path),
            ("nativetop_path", &self.console.nativetop_path),
            ("jstatpri_path", &self.console.jstatpri_path),
            ("dcounter_path", &self.console.dcounter_path),
        ];
        for (name, value) in paths {
            if !value.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "console.{} must start with '/': {:?}",
                    name, value
                )));
            }
        }
        for (i, device) in self.devices.iter().enumerate() {
            validate_base(&device.base)
                .map_err(|msg| ConfigError::Invalid(format!("devices[{}].base: {}", i, msg)))?;
            validate_place(&device.place)
                .map_err(|msg| ConfigError::Invalid(format!("devices[{}].place: {}", i, msg)))?;
        }
        Ok(())
    }
}

fn validate_base(base: &str) -> Result<(), String> {
    let url = Url::parse(base).map_err(|e| format!("{:?} is not a URL ({})", base, e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme {:?}", other)),
    }
    if url.host_str().is_none() {
        return Err(format!("{:?} has no host", base));
    }
    Ok(())
}

/// A place label ends up as the first field of a tab-separated line, so it
/// must be non-empty and free of tabs and line breaks.
pub fn validate_place(place: &str) -> Result<(), String> {
    if place.trim().is_empty() {
        return Err("place must not be empty".into());
    }
    if place.contains(['\t', '\n', '\r']) {
        return Err(format!("{:?} contains a tab or line break", place));
    }
    Ok(())
}

/// Builds credentials from a variable lookup (the process environment in
/// production, a map in tests).
pub fn credentials_from<F>(lookup: F) -> Result<Credentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let user = lookup(USER_ENV)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingCredential(USER_ENV))?;
    let pass = lookup(PASS_ENV).ok_or(ConfigError::MissingCredential(PASS_ENV))?;
    Ok(Credentials::new(user, pass))
}

/// Reads `PRINTCOUNT_USER` / `PRINTCOUNT_PASS` from the process environment.
pub fn credentials_from_env() -> Result<Credentials, ConfigError> {
    credentials_from(|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [timeouts]
        action_ms = 3000

        [[devices]]
        base = "http://10.10.21.11:8000"
        place = "SCM자재사무실"

        [[devices]]
        base = "http://10.100.1.15:8000"
        place = "시험측정실"
    "#;

    #[test]
    fn parses_devices_and_defaults() {
        let config = FleetConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[1].place, "시험측정실");
        assert_eq!(config.timeouts.action_ms, 3000);
        assert_eq!(config.timeouts.nav_ms, 12000);
        assert_eq!(config.console, ConsolePaths::default());
    }

    #[test]
    fn console_paths_can_be_overridden() {
        let toml = r#"
            [console]
            dcounter_path = "/rps/dcounter.cgi?CorePGTAG=15&Dummy={dummy}"
            [[devices]]
            base = "https://printer.local"
            place = "A"
        "#;
        let config = FleetConfig::from_toml_str(toml).unwrap();
        assert_eq!(
            config.console.dcounter_path,
            "/rps/dcounter.cgi?CorePGTAG=15&Dummy={dummy}"
        );
        assert_eq!(config.console.login_path, "/rps/");
    }

    #[test]
    fn empty_fleet_is_rejected() {
        let err = FleetConfig::from_toml_str("").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let toml = r#"
            [[devices]]
            base = "ftp://10.0.0.1"
            place = "A"
        "#;
        let err = FleetConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("devices[0].base"));
    }

    #[test]
    fn place_with_tab_is_rejected() {
        let toml = "[[devices]]\nbase = \"http://10.0.0.1\"\nplace = \"A\\tB\"\n";
        let err = FleetConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("devices[0].place"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let toml = r#"
            [[devices]]
            base = "http://10.0.0.1"
            place = "A"
            password = "x"
        "#;
        assert!(matches!(
            FleetConfig::from_toml_str(toml),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn credentials_require_user() {
        let env: HashMap<&str, &str> = HashMap::from([(PASS_ENV, "pw")]);
        let err = credentials_from(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(USER_ENV)));
    }

    #[test]
    fn credentials_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([(USER_ENV, "Administrator"), (PASS_ENV, "pw")]);
        let creds = credentials_from(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.username, "Administrator");
        assert_eq!(creds.password, "pw");
    }
}
