// src/config.rs

//! Startup configuration, read once from a TOML file.
//!
//! ```toml
//! [reader]
//! com_port = 0
//! driver = "pn532"
//! remove_timeout = 5
//!
//! [tag_commands]
//! "04a1b2c3d4e5f6" = "mpv --fs game1.mp4"
//! ```
//!
//! Any missing or malformed required value is fatal; nothing is defaulted
//! except the optional keys documented on [`ReaderConfig`] and the `[log]` table.

use crate::common::{
    tag::{CommandTable, TagId},
    timing,
};
use crate::logging::LogConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Conventional file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "nfcread.toml";

#[cfg(windows)]
pub const DEFAULT_EXIT_COMMAND: &str = "exit.bat";
#[cfg(not(windows))]
pub const DEFAULT_EXIT_COMMAND: &str = "./exit.sh";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{} not found: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error reading configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serial port of the reader: a bare number or an explicit device path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    Number(u32),
    Path(String),
}

impl PortSpec {
    /// A quoted port number (`"3"`) means the same as the bare number.
    fn normalized(self) -> Self {
        match self {
            PortSpec::Path(path) if !path.is_empty() && path.bytes().all(|b| b.is_ascii_digit()) => {
                path.parse().map(PortSpec::Number).unwrap_or(PortSpec::Path(path))
            }
            other => other,
        }
    }

    /// Device path handed to the serial layer. Numbers map to `COM<n>` on
    /// Windows and `/dev/ttyUSB<n>` elsewhere.
    pub fn device_path(&self) -> String {
        match self {
            #[cfg(windows)]
            PortSpec::Number(n) => format!("COM{n}"),
            #[cfg(not(windows))]
            PortSpec::Number(n) => format!("/dev/ttyUSB{n}"),
            PortSpec::Path(path) => path.clone(),
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.device_path())
    }
}

/// Supported reader hardware families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Pn532,
}

impl Driver {
    pub fn name(&self) -> &'static str {
        match self {
            Driver::Pn532 => "pn532",
        }
    }

    pub fn default_baud(&self) -> u32 {
        match self {
            Driver::Pn532 => timing::PN532_DEFAULT_BAUD,
        }
    }
}

impl FromStr for Driver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pn532" | "pn532_uart" => Ok(Driver::Pn532),
            other => Err(ConfigError::Invalid(format!("unsupported reader driver `{other}`"))),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated `[reader]` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    pub port: PortSpec,
    pub driver: Driver,
    /// Removal countdown, in whole seconds.
    pub remove_timeout: u32,
    /// Optional `baud_rate`; defaults to the driver's native rate.
    pub baud_rate: u32,
    /// Optional `exit_command`; defaults to [`DEFAULT_EXIT_COMMAND`].
    pub exit_command: String,
}

/// The whole validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub reader: ReaderConfig,
    pub tag_commands: CommandTable,
    pub log: LogConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    reader: RawReader,
    tag_commands: BTreeMap<String, String>,
    #[serde(default)]
    log: LogConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReader {
    com_port: PortSpec,
    driver: String,
    remove_timeout: u32,
    baud_rate: Option<u32>,
    exit_command: Option<String>,
}

impl Config {
    /// Reads and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses and validates configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let driver: Driver = raw.reader.driver.parse()?;

        let port = raw.reader.com_port.normalized();
        if let PortSpec::Path(path) = &port {
            if path.trim().is_empty() {
                return Err(ConfigError::Invalid("reader.com_port is empty".into()));
            }
        }

        let baud_rate = raw.reader.baud_rate.unwrap_or_else(|| driver.default_baud());
        if baud_rate == 0 {
            return Err(ConfigError::Invalid("reader.baud_rate must be positive".into()));
        }

        let exit_command = match raw.reader.exit_command {
            Some(cmd) if cmd.trim().is_empty() => {
                return Err(ConfigError::Invalid("reader.exit_command is empty".into()));
            }
            Some(cmd) => cmd,
            None => DEFAULT_EXIT_COMMAND.to_string(),
        };

        let mut entries = Vec::with_capacity(raw.tag_commands.len());
        let mut seen = std::collections::HashSet::new();
        for (key, command) in raw.tag_commands {
            let tag: TagId = key
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("tag id `{key}` is not valid hex")))?;
            if command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("command for tag `{key}` is empty")));
            }
            // "04AB" and "04ab" name the same tag
            if !seen.insert(tag.clone()) {
                return Err(ConfigError::Invalid(format!("tag id `{key}` is listed twice")));
            }
            entries.push((tag, command));
        }

        Ok(Config {
            reader: ReaderConfig {
                port,
                driver,
                remove_timeout: raw.reader.remove_timeout,
                baud_rate,
                exit_command,
            },
            tag_commands: entries.into_iter().collect(),
            log: raw.log,
        })
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    const SAMPLE: &str = r#"
[reader]
com_port = 3
driver = "pn532"
remove_timeout = 5

[tag_commands]
"04A1B2C3" = "mpv game1.mp4"
"deadbeef" = "mpv game2.mp4"
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.reader.port, PortSpec::Number(3));
        assert_eq!(config.reader.driver, Driver::Pn532);
        assert_eq!(config.reader.remove_timeout, 5);
        assert_eq!(config.reader.baud_rate, 115_200);
        assert_eq!(config.reader.exit_command, DEFAULT_EXIT_COMMAND);
        assert_eq!(config.tag_commands.len(), 2);

        let tag: TagId = "04a1b2c3".parse().unwrap();
        assert_eq!(config.tag_commands.lookup(&tag), Some("mpv game1.mp4"));
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn test_parse_optional_keys() {
        let text = r#"
[reader]
com_port = "/dev/ttyAMA0"
driver = "PN532_UART"
remove_timeout = 0
baud_rate = 9600
exit_command = "pkill mpv"

[tag_commands]

[log]
level = "debug"
format = "json"
"#;
        let config = Config::parse(text).unwrap();
        assert_eq!(config.reader.port.device_path(), "/dev/ttyAMA0");
        assert_eq!(config.reader.baud_rate, 9600);
        assert_eq!(config.reader.exit_command, "pkill mpv");
        assert!(config.tag_commands.is_empty());
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    #[cfg(not(windows))]
    fn test_numeric_port_maps_to_tty() {
        assert_eq!(PortSpec::Number(0).device_path(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_quoted_port_number_is_a_number() {
        let quoted = "[reader]\ncom_port = \"3\"\ndriver = \"pn532\"\nremove_timeout = 1\n[tag_commands]\n";
        let config = Config::parse(quoted).unwrap();
        assert_eq!(config.reader.port, PortSpec::Number(3));

        let named = "[reader]\ncom_port = \"COM3\"\ndriver = \"pn532\"\nremove_timeout = 1\n[tag_commands]\n";
        let config = Config::parse(named).unwrap();
        assert_eq!(config.reader.port, PortSpec::Path("COM3".into()));
    }

    #[test]
    fn test_missing_required_keys_are_fatal() {
        let no_timeout = "[reader]\ncom_port = 0\ndriver = \"pn532\"\n[tag_commands]\n";
        assert!(matches!(Config::parse(no_timeout), Err(ConfigError::Parse(_))));

        let no_table = "[reader]\ncom_port = 0\ndriver = \"pn532\"\nremove_timeout = 1\n";
        assert!(matches!(Config::parse(no_table), Err(ConfigError::Parse(_))));

        assert!(matches!(Config::parse("not toml ["), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_values_are_fatal() {
        let negative = "[reader]\ncom_port = 0\ndriver = \"pn532\"\nremove_timeout = -1\n[tag_commands]\n";
        assert!(matches!(Config::parse(negative), Err(ConfigError::Parse(_))));

        let driver = "[reader]\ncom_port = 0\ndriver = \"acr122\"\nremove_timeout = 1\n[tag_commands]\n";
        assert!(matches!(Config::parse(driver), Err(ConfigError::Invalid(_))));

        let bad_tag = "[reader]\ncom_port = 0\ndriver = \"pn532\"\nremove_timeout = 1\n[tag_commands]\n\"xyz\" = \"foo\"\n";
        assert!(matches!(Config::parse(bad_tag), Err(ConfigError::Invalid(_))));

        let empty_cmd = "[reader]\ncom_port = 0\ndriver = \"pn532\"\nremove_timeout = 1\n[tag_commands]\n\"aa\" = \"  \"\n";
        assert!(matches!(Config::parse(empty_cmd), Err(ConfigError::Invalid(_))));

        let duplicate = "[reader]\ncom_port = 0\ndriver = \"pn532\"\nremove_timeout = 1\n[tag_commands]\n\"AA\" = \"foo\"\n\"aa\" = \"bar\"\n";
        assert!(matches!(Config::parse(duplicate), Err(ConfigError::Invalid(_))));

        let unknown = "[reader]\ncom_port = 0\ndriver = \"pn532\"\nremove_timeout = 1\nspeed = 3\n[tag_commands]\n";
        assert!(matches!(Config::parse(unknown), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here/nfcread.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().starts_with("/definitely/not/here/nfcread.toml not found"));
    }
}
