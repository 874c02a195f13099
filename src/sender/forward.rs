use super::reconnect::ReconnectPolicy;
use super::serialization::{EntryEncoder, WireFormat};
use super::stats::{ForwardStats, ForwardStatsSnapshot};
use super::{Transport, TransportError};
use crate::domain::TransportRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 24224;
pub const DEFAULT_BUFFER_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ForwardConfig {
    pub host: String,
    pub port: u16,
    /// Largest encoded entry accepted by `post`
    pub buffer_limit: usize,
    pub connect_timeout: Duration,
    /// `None` lets writes block until the kernel accepts the bytes
    pub write_timeout: Option<Duration>,
    pub reconnect: ReconnectPolicy,
    pub format: WireFormat,
    pub sub_second_precision: bool,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            buffer_limit: DEFAULT_BUFFER_LIMIT,
            connect_timeout: Duration::from_secs(3),
            write_timeout: None,
            reconnect: ReconnectPolicy::default(),
            format: WireFormat::Forward,
            sub_second_precision: false,
        }
    }
}

impl ForwardConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Default)]
struct Connection {
    stream: Option<TcpStream>,
    closed: bool,
}

/// TCP client for Fluentd / Fluent Bit forward inputs.
///
/// Connects lazily on the first post and again after any write failure.
/// Posts are serialized through one async mutex, so entries written by
/// concurrent callers never interleave.
#[derive(Debug)]
pub struct ForwardClient {
    config: ForwardConfig,
    encoder: EntryEncoder,
    connection: Mutex<Connection>,
    stats: Arc<ForwardStats>,
}

impl ForwardClient {
    pub fn new(config: ForwardConfig) -> Result<Self, TransportError> {
        let encoder = EntryEncoder::new(config.format, config.sub_second_precision);
        Self::with_encoder(config, encoder)
    }

    pub fn with_encoder(config: ForwardConfig, encoder: EntryEncoder) -> Result<Self, TransportError> {
        if config.host.trim().is_empty() {
            return Err(TransportError::InvalidConfiguration("host must not be empty".to_string()));
        }
        if config.port == 0 {
            return Err(TransportError::InvalidConfiguration("port must be greater than 0".to_string()));
        }
        if config.buffer_limit == 0 {
            return Err(TransportError::InvalidConfiguration(
                "buffer limit must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            config,
            encoder,
            connection: Mutex::new(Connection::default()),
            stats: Arc::new(ForwardStats::new()),
        })
    }

    pub fn config(&self) -> &ForwardConfig {
        &self.config
    }

    pub fn stats(&self) -> ForwardStatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.stream.is_some()
    }

    async fn post_entry(&self, tag: &str, record: &TransportRecord) -> Result<(), TransportError> {
        let payload = self.encoder.encode(tag, record)?;
        if payload.len() > self.config.buffer_limit {
            self.stats.record_failed_post();
            return Err(TransportError::BufferOverflow {
                size: payload.len(),
                limit: self.config.buffer_limit,
            });
        }

        let mut connection = self.connection.lock().await;
        if connection.closed {
            return Err(TransportError::Closed);
        }

        let mut stream = match connection.stream.take() {
            Some(stream) => stream,
            None => match self.connect().await {
                Ok(stream) => stream,
                Err(e) => {
                    self.stats.record_failed_post();
                    return Err(e);
                }
            },
        };

        match self.write_payload(&mut stream, &payload).await {
            Ok(()) => {
                connection.stream = Some(stream);
                self.stats.record_post(payload.len() as u64);
                Ok(())
            }
            Err(e) => {
                // The socket state is unknown after a failed write; drop it
                debug!("Dropping forward connection to {}: {}", self.config.address(), e);
                self.stats.record_failed_post();
                Err(e)
            }
        }
    }

    async fn connect(&self) -> Result<TcpStream, TransportError> {
        let address = self.config.address();
        let policy = &self.config.reconnect;
        let mut attempt = 0;

        loop {
            let reason = match timeout(self.config.connect_timeout, TcpStream::connect(&address)).await {
                Ok(Ok(stream)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Failed to set TCP_NODELAY on {}: {}", address, e);
                    }
                    self.stats.record_connect();
                    debug!("Connected to forward input at {} (attempt {})", address, attempt + 1);
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    self.stats.record_connection_error();
                    e.to_string()
                }
                Err(_) => {
                    self.stats.record_timeout_error();
                    format!("connect timed out after {:?}", self.config.connect_timeout)
                }
            };

            if attempt >= policy.max_retry {
                return Err(TransportError::ConnectionFailed {
                    address,
                    attempts: attempt + 1,
                    reason,
                });
            }

            let delay = policy.calculate_delay(attempt);
            debug!(
                "Connection to {} failed ({}), retrying in {:?}",
                address, reason, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn write_payload(&self, stream: &mut TcpStream, payload: &[u8]) -> Result<(), TransportError> {
        let write = async {
            stream.write_all(payload).await?;
            stream.flush().await
        };

        let result = match self.config.write_timeout {
            Some(limit) => match timeout(limit, write).await {
                Ok(result) => result,
                Err(_) => {
                    self.stats.record_timeout_error();
                    return Err(TransportError::Timeout(limit));
                }
            },
            None => write.await,
        };

        result.map_err(|e| TransportError::ConnectionLost(e.to_string()))
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        let mut connection = self.connection.lock().await;
        if connection.closed {
            return Err(TransportError::Closed);
        }
        connection.closed = true;

        if let Some(mut stream) = connection.stream.take() {
            stream.flush().await?;
            stream.shutdown().await?;
            debug!("Closed forward connection to {}", self.config.address());
        }
        Ok(())
    }
}

impl Transport for ForwardClient {
    async fn post(&self, tag: &str, record: &TransportRecord) -> Result<(), TransportError> {
        self.post_entry(tag, record).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.shutdown().await
    }
}
