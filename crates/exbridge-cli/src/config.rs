//! `serve` configuration: optional TOML file merged under CLI flags.
//!
//! ```toml
//! [watch]
//! exchange_dir = "/srv/eep/exchange"
//! file_name = "ak-eep-out.json"
//! poll_interval_ms = 250
//!
//! [server]
//! port = 3000
//! json_logs = true
//! ```

use exbridge_core::errors::BridgeError;
use exbridge_core::source::WatchConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;

/// Contents of the config file; every field is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub watch: WatchSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    pub exchange_dir: Option<PathBuf>,
    pub file_name: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub json_logs: Option<bool>,
}

impl FileConfig {
    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Config` if it is not valid TOML or
    /// contains unknown fields.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let content = std::fs::read_to_string(path).map_err(|e| BridgeError::io(path, &e))?;
        Self::parse(&content).map_err(|e| BridgeError::Config {
            message: format!("{}: {}", path.display(), e),
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub exchange_dir: Option<PathBuf>,
    pub file_name: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub port: Option<u16>,
    pub json_logs: bool,
}

/// Effective settings for `serve`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeSettings {
    pub watch: WatchConfig,
    pub port: u16,
    pub json_logs: bool,
}

impl ServeSettings {
    /// Merge flags over file values over defaults.
    ///
    /// # Errors
    ///
    /// `Config` if the resulting poll interval is zero.
    pub fn resolve(file: FileConfig, flags: Overrides) -> Result<Self, BridgeError> {
        let mut watch = WatchConfig::default();
        if let Some(dir) = flags.exchange_dir.or(file.watch.exchange_dir) {
            watch.exchange_dir = dir;
        }
        if let Some(name) = flags.file_name.or(file.watch.file_name) {
            watch.file_name = name;
        }
        if let Some(ms) = flags.poll_interval_ms.or(file.watch.poll_interval_ms) {
            if ms == 0 {
                return Err(BridgeError::Config {
                    message: "poll_interval_ms must be greater than zero".to_string(),
                });
            }
            watch.poll_interval = Duration::from_millis(ms);
        }

        Ok(Self {
            watch,
            port: flags.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
            json_logs: flags.json_logs || file.server.json_logs.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exbridge_core::errors::ExErrorKind;

    #[test]
    fn test_defaults_without_file_or_flags() {
        let settings = ServeSettings::resolve(FileConfig::default(), Overrides::default()).unwrap();
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.watch, WatchConfig::default());
        assert!(!settings.json_logs);
    }

    #[test]
    fn test_file_values_apply() {
        let file = FileConfig::parse(
            r#"
            [watch]
            exchange_dir = "/srv/exchange"
            poll_interval_ms = 1000

            [server]
            port = 8080
            json_logs = true
            "#,
        )
        .unwrap();

        let settings = ServeSettings::resolve(file, Overrides::default()).unwrap();
        assert_eq!(settings.watch.exchange_dir, PathBuf::from("/srv/exchange"));
        assert_eq!(settings.watch.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.port, 8080);
        assert!(settings.json_logs);
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig::parse("[server]\nport = 8080\n[watch]\nfile_name = \"a.json\"").unwrap();
        let flags = Overrides {
            port: Some(9000),
            ..Overrides::default()
        };

        let settings = ServeSettings::resolve(file, flags).unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.watch.file_name, "a.json");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(FileConfig::parse("[server]\nprot = 1").is_err());
        assert!(FileConfig::parse("[metrics]\nenabled = true").is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let flags = Overrides {
            poll_interval_ms: Some(0),
            ..Overrides::default()
        };
        let err = ServeSettings::resolve(FileConfig::default(), flags).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = FileConfig::load(Path::new("/nonexistent/exbridge.toml")).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Io);
    }
}
