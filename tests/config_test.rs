use fluent_event_sink::app::{Config, ConfigError, LogFormat, LogLevel};
use fluent_event_sink::sender::WireFormat;
use fluent_event_sink::FluentSink;
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const ENV_VARS: [&str; 10] = [
    "CONFIG_FILE",
    "FLUENT_HOST",
    "FLUENT_PORT",
    "FLUENT_TAG",
    "FLUENT_DEDOT",
    "FLUENT_BUFFER_SIZE",
    "FLUENT_FORMAT",
    "LOG_LEVEL",
    "LOG_FORMAT",
    "RUST_LOG",
];

fn clean_all_env_vars() {
    unsafe {
        for var in &ENV_VARS {
            env::remove_var(var);
        }
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const FULL_CONFIG: &str = r#"
log_level = "debug"
log_format = "json"

[sink]
host = "fluent-bit.logging.svc"
port = 24224
tag = "k8s.events"
deDot = true
bufferSize = 65536
connectTimeoutMs = 1500
writeTimeoutMs = 500
maxRetry = 5
retryWaitMs = 200
format = "forward"
subSecondPrecision = true

[sink.layout]
msg = "$.reason"
app = '$.involvedObject.labels["app_kubernetes_io/name"]'
summary = "{{ .InvolvedObject.Kind }}/{{ .InvolvedObject.Name }}"

[sink.layout.kubernetes]
namespace = "$.involvedObject.namespace"
"#;

#[test]
#[serial]
fn test_config_from_file() {
    clean_all_env_vars();
    let file = write_config(FULL_CONFIG);

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.sink.host, "fluent-bit.logging.svc");
    assert_eq!(config.sink.tag, "k8s.events");
    assert!(config.sink.de_dot);
    assert_eq!(config.sink.buffer_size, 65536);
    assert_eq!(config.sink.connect_timeout, Duration::from_millis(1500));
    assert_eq!(config.sink.write_timeout, Some(Duration::from_millis(500)));
    assert_eq!(config.sink.max_retry, 5);
    assert!(config.sink.sub_second_precision);
    assert_eq!(
        config.sink.layout.clone().map(serde_json::Value::Object),
        Some(json!({
            "msg": "$.reason",
            "app": "$.involvedObject.labels[\"app_kubernetes_io/name\"]",
            "summary": "{{ .InvolvedObject.Kind }}/{{ .InvolvedObject.Name }}",
            "kubernetes": {"namespace": "$.involvedObject.namespace"}
        }))
    );

    let forward = config.sink.forward_config();
    assert_eq!(forward.address(), "fluent-bit.logging.svc:24224");
    assert_eq!(forward.reconnect.max_retry, 5);
    assert_eq!(forward.reconnect.retry_wait, Duration::from_millis(200));

    let sink = FluentSink::connect(&config.sink).unwrap();
    assert_eq!(sink.tag(), "k8s.events");
    assert!(sink.de_dot());
    assert_eq!(sink.layout().map(|layout| layout.len()), Some(4));
}

#[test]
#[serial]
fn test_config_from_environment() {
    clean_all_env_vars();
    unsafe {
        env::set_var("FLUENT_HOST", "collector.internal");
        env::set_var("FLUENT_PORT", "5170");
        env::set_var("FLUENT_TAG", "cluster-a.events");
        env::set_var("FLUENT_DEDOT", "true");
        env::set_var("FLUENT_FORMAT", "json");
        env::set_var("LOG_LEVEL", "warn");
    }

    let config = Config::from_env().unwrap();

    assert_eq!(config.sink.host, "collector.internal");
    assert_eq!(config.sink.port, 5170);
    assert_eq!(config.sink.tag, "cluster-a.events");
    assert!(config.sink.de_dot);
    assert_eq!(config.sink.format, WireFormat::JsonLines);
    assert_eq!(config.log_level, LogLevel::Warn);
    assert!(config.sink.layout.is_none());

    clean_all_env_vars();
}

#[test]
#[serial]
fn test_cli_overrides_file() {
    clean_all_env_vars();
    let file = write_config(FULL_CONFIG);

    let path = file.path().to_string_lossy().into_owned();
    let config = Config::from_args([
        "fluent-event-sink",
        "--config-file",
        path.as_str(),
        "--tag",
        "override",
        "--de-dot",
        "false",
    ])
    .unwrap();

    assert_eq!(config.sink.tag, "override");
    assert!(!config.sink.de_dot);
    // untouched fields still come from the file
    assert_eq!(config.sink.host, "fluent-bit.logging.svc");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.sink.layout.is_some());
    assert_eq!(config.config_file.as_deref(), Some(file.path()));
}

#[test]
#[serial]
fn test_explicit_default_log_settings_override_file() {
    clean_all_env_vars();
    let file = write_config(FULL_CONFIG);
    let path = file.path().to_string_lossy().into_owned();

    let config = Config::from_args([
        "fluent-event-sink",
        "--config-file",
        path.as_str(),
        "--log-level",
        "info",
        "--log-format",
        "text",
    ])
    .unwrap();
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.log_format, LogFormat::Text);

    unsafe {
        env::set_var("LOG_LEVEL", "info");
    }
    let config = Config::from_args(["fluent-event-sink", "--config-file", path.as_str()]).unwrap();
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.log_format, LogFormat::Json);

    clean_all_env_vars();
}

#[test]
#[serial]
fn test_config_file_named_by_environment() {
    clean_all_env_vars();
    let file = write_config("[sink]\ntag = \"from-env-file\"\n");
    unsafe {
        env::set_var("CONFIG_FILE", file.path());
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.sink.tag, "from-env-file");

    clean_all_env_vars();
}

#[test]
fn test_invalid_layout_is_rejected() {
    let err = Config::from_toml_str(
        r#"
        [sink.layout]
        msg = "$..reason"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLayout(_)));
    assert!(err.to_string().contains("msg"), "{err}");
}

#[test]
fn test_invalid_values_are_rejected() {
    for content in [
        "[sink]\nport = 0\n",
        "[sink]\ntag = \"\"\n",
        "[sink]\nhost = \" \"\n",
        "[sink]\nbufferSize = 0\n",
        "[sink]\nconnectTimeoutMs = 0\n",
    ] {
        let err = Config::from_toml_str(content).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(_)), "{content}: {err}");
    }

    let err = Config::from_toml_str("[sink]\nport = \"many\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
#[serial]
fn test_missing_config_file() {
    clean_all_env_vars();
    let err = Config::from_args(["fluent-event-sink", "--config-file", "/nonexistent/sink.toml"])
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileError(_)));
}
