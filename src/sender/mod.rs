//! Delivery layer: the transport seam the sink posts through, plus the TCP
//! forward client used in production.

pub mod forward;
pub mod reconnect;
pub mod serialization;
pub mod stats;

pub use forward::{ForwardClient, ForwardConfig};
pub use reconnect::ReconnectPolicy;
pub use serialization::{Clock, EntryEncoder, SerializationError, SystemClock, WireFormat};
pub use stats::{ForwardStats, ForwardStatsSnapshot};

use crate::domain::TransportRecord;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Connection to {address} failed after {attempts} attempt(s): {reason}")]
    ConnectionFailed {
        address: String,
        attempts: u32,
        reason: String,
    },
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
    #[error("Entry of {size} bytes exceeds buffer limit of {limit} bytes")]
    BufferOverflow { size: usize, limit: usize },
    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),
    #[error("Write timed out after {0:?}")]
    Timeout(Duration),
    #[error("Transport is closed")]
    Closed,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A buffering, reconnecting client that delivers tagged records.
pub trait Transport: Send + Sync {
    /// Deliver one record under `tag`.
    fn post(
        &self,
        tag: &str,
        record: &TransportRecord,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Flush and release the connection. Call once, after the last post.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn post(
        &self,
        tag: &str,
        record: &TransportRecord,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).post(tag, record)
    }

    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).close()
    }
}
