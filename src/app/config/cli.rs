use super::{ConfigError, LogFormat, LogLevel, SinkConfig};
use crate::sender::WireFormat;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Process configuration.
///
/// The TOML file carries the full `[sink]` table (including the layout);
/// flags and environment variables override individual connection fields.
#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(
    author,
    version,
    about = "Forward Kubernetes events read from stdin to Fluentd / Fluent Bit",
    long_about = None
)]
pub struct Config {
    /// Configuration file path (TOML)
    #[arg(long, env = "CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Collector host
    #[arg(long, env = "FLUENT_HOST")]
    #[serde(skip)]
    pub host: Option<String>,

    /// Collector port
    #[arg(long, env = "FLUENT_PORT")]
    #[serde(skip)]
    pub port: Option<u16>,

    /// Tag attached to every record
    #[arg(long, env = "FLUENT_TAG")]
    #[serde(skip)]
    pub tag: Option<String>,

    /// Replace dots in label and annotation keys (true/false)
    #[arg(long, env = "FLUENT_DEDOT")]
    #[serde(skip)]
    pub de_dot: Option<bool>,

    /// Largest encoded entry in bytes
    #[arg(long, env = "FLUENT_BUFFER_SIZE")]
    #[serde(skip)]
    pub buffer_size: Option<usize>,

    /// Wire format (forward, forward-json or json)
    #[arg(long, env = "FLUENT_FORMAT")]
    #[serde(skip)]
    pub format: Option<WireFormat>,

    /// Log level [default: info]
    #[arg(long = "log-level", env = "LOG_LEVEL", value_name = "LEVEL")]
    #[serde(skip)]
    pub cli_log_level: Option<LogLevel>,

    /// Log output format [default: text]
    #[arg(long = "log-format", env = "LOG_FORMAT", value_name = "FORMAT")]
    #[serde(skip)]
    pub cli_log_format: Option<LogFormat>,

    /// Effective log level (file value, overridden by the flag)
    #[arg(skip)]
    #[serde(default)]
    pub log_level: LogLevel,

    /// Effective log output format
    #[arg(skip)]
    #[serde(default)]
    pub log_format: LogFormat,

    /// Sink configuration (file only)
    #[arg(skip)]
    #[serde(default)]
    pub sink: SinkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_file: None,
            host: None,
            port: None,
            tag: None,
            de_dot: None,
            buffer_size: None,
            format: None,
            cli_log_level: None,
            cli_log_format: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            sink: SinkConfig::default(),
        }
    }
}

impl Config {
    /// Parse flags (and their environment fallbacks), layer them over the
    /// configuration file if one is named, and validate the result.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Config::try_parse_from(args)?;

        let mut config = match &cli.config_file {
            Some(path) => Self::read_file(path)?,
            None => Config::default(),
        };
        config.merge_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_args([env!("CARGO_PKG_NAME")])
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path.as_ref())?;
        config.config_file = Some(path.as_ref().to_path_buf());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn merge_cli(&mut self, cli: Config) {
        if let Some(host) = cli.host {
            self.sink.host = host;
        }
        if let Some(port) = cli.port {
            self.sink.port = port;
        }
        if let Some(tag) = cli.tag {
            self.sink.tag = tag;
        }
        if let Some(de_dot) = cli.de_dot {
            self.sink.de_dot = de_dot;
        }
        if let Some(buffer_size) = cli.buffer_size {
            self.sink.buffer_size = buffer_size;
        }
        if let Some(format) = cli.format {
            self.sink.format = format;
        }

        if let Some(log_level) = cli.cli_log_level {
            self.log_level = log_level;
        }
        if let Some(log_format) = cli.cli_log_format {
            self.log_format = log_format;
        }
        self.config_file = cli.config_file;
    }
}
