use crate::sender::forward::{DEFAULT_BUFFER_LIMIT, DEFAULT_HOST, DEFAULT_PORT};
use crate::sender::{ForwardConfig, ReconnectPolicy, WireFormat};
use crate::sink::SinkSettings;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub const DEFAULT_TAG: &str = "kube.events";

/// `[sink]` table: where events go and what happens to them on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SinkConfig {
    pub host: String,
    pub port: u16,
    pub tag: String,
    /// Replace `.` with `_` in label and annotation keys
    pub de_dot: bool,
    /// Output template; the event is forwarded as-is when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<Map<String, Value>>,
    /// Largest encoded entry, in bytes
    pub buffer_size: usize,
    #[serde(rename = "connectTimeoutMs", with = "super::serde_helpers")]
    pub connect_timeout: Duration,
    #[serde(rename = "writeTimeoutMs", with = "super::serde_helpers::optional")]
    pub write_timeout: Option<Duration>,
    pub max_retry: u32,
    #[serde(rename = "retryWaitMs", with = "super::serde_helpers")]
    pub retry_wait: Duration,
    pub format: WireFormat,
    pub sub_second_precision: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        let reconnect = ReconnectPolicy::default();
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tag: DEFAULT_TAG.to_string(),
            de_dot: false,
            layout: None,
            buffer_size: DEFAULT_BUFFER_LIMIT,
            connect_timeout: Duration::from_secs(3),
            write_timeout: None,
            max_retry: reconnect.max_retry,
            retry_wait: reconnect.retry_wait,
            format: WireFormat::Forward,
            sub_second_precision: false,
        }
    }
}

impl SinkConfig {
    pub fn forward_config(&self) -> ForwardConfig {
        ForwardConfig {
            host: self.host.clone(),
            port: self.port,
            buffer_limit: self.buffer_size,
            connect_timeout: self.connect_timeout,
            write_timeout: self.write_timeout,
            reconnect: ReconnectPolicy {
                max_retry: self.max_retry,
                retry_wait: self.retry_wait,
                ..ReconnectPolicy::default()
            },
            format: self.format,
            sub_second_precision: self.sub_second_precision,
        }
    }

    pub fn settings(&self) -> SinkSettings {
        SinkSettings {
            tag: self.tag.clone(),
            de_dot: self.de_dot,
            layout: self.layout.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_camel_case_keys() {
        let config: SinkConfig = toml::from_str(
            r#"
            host = "fluent-bit.logging"
            port = 5170
            tag = "k8s.events"
            deDot = true
            bufferSize = 1024
            writeTimeoutMs = 250
            format = "json"

            [layout]
            msg = "$.reason"
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "fluent-bit.logging");
        assert_eq!(config.port, 5170);
        assert!(config.de_dot);
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.write_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.format, WireFormat::JsonLines);
        assert_eq!(config.layout.unwrap().get("msg"), Some(&json!("$.reason")));
        // untouched keys keep their defaults
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.max_retry, 3);
    }

    #[test]
    fn test_forward_config_mapping() {
        let config = SinkConfig {
            buffer_size: 99,
            max_retry: 0,
            ..Default::default()
        };

        let forward = config.forward_config();
        assert_eq!(forward.address(), "127.0.0.1:24224");
        assert_eq!(forward.buffer_limit, 99);
        assert_eq!(forward.reconnect.max_retry, 0);
    }

    #[test]
    fn test_zero_write_timeout_means_disabled() {
        let config: SinkConfig = toml::from_str("writeTimeoutMs = 0").unwrap();
        assert_eq!(config.write_timeout, None);
    }
}
