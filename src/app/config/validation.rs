use super::{Config, ConfigError, SinkConfig};
use crate::transform::LayoutTemplate;

impl SinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("Host must not be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidConfig("Port must be greater than 0".to_string()));
        }

        if self.tag.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("Tag must not be empty".to_string()));
        }

        if self.buffer_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        // A bad template is a startup failure, not a per-event one
        if let Some(layout) = &self.layout {
            LayoutTemplate::compile(layout)?;
        }

        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sink.validate()
    }
}
