use crate::domain::TransportRecord;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

// Typical event record size, used for the initial buffer allocation
const ESTIMATED_ENTRY_SIZE: usize = 512;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("MessagePack serialization failed: {0}")]
    MsgPackError(#[from] rmp_serde::encode::Error),
    #[error("MessagePack write failed: {0}")]
    MsgPackWriteError(#[from] rmp::encode::ValueWriteError),
    #[error("IO error during serialization: {0}")]
    IoError(#[from] std::io::Error),
}

/// How one entry is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Forward protocol message mode in MessagePack: `[tag, time, record]`.
    /// Accepted by both Fluentd and Fluent Bit `forward` inputs.
    #[default]
    Forward,
    /// The same `[tag, time, record]` array as one JSON line (Fluentd only)
    #[value(name = "forward-json")]
    #[serde(rename = "forward-json")]
    ForwardJson,
    /// One JSON object per line with `tag` and `time` added (Fluent Bit `tcp` input)
    #[value(name = "json")]
    #[serde(rename = "json")]
    JsonLines,
}

// Forward protocol EventTime extension: 32-bit seconds and nanoseconds, big endian
const EVENT_TIME_EXT_TYPE: i8 = 0;
const EVENT_TIME_LEN: u32 = 8;

/// Source of entry timestamps.
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone)]
pub struct EntryEncoder {
    format: WireFormat,
    sub_second_precision: bool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for EntryEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryEncoder")
            .field("format", &self.format)
            .field("sub_second_precision", &self.sub_second_precision)
            .finish_non_exhaustive()
    }
}

impl EntryEncoder {
    pub fn new(format: WireFormat, sub_second_precision: bool) -> Self {
        Self::with_clock(format, sub_second_precision, Arc::new(SystemClock))
    }

    pub fn with_clock(format: WireFormat, sub_second_precision: bool, clock: Arc<dyn Clock>) -> Self {
        Self {
            format,
            sub_second_precision,
            clock,
        }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Encode one entry. JSON formats are newline-terminated; MessagePack
    /// entries are self-delimiting.
    pub fn encode(&self, tag: &str, record: &TransportRecord) -> Result<Bytes, SerializationError> {
        let now = self.clock.now();
        let mut buffer = BytesMut::with_capacity(ESTIMATED_ENTRY_SIZE).writer();

        match self.format {
            WireFormat::Forward => {
                rmp::encode::write_array_len(&mut buffer, 3)?;
                rmp::encode::write_str(&mut buffer, tag)?;
                self.write_msgpack_time(&mut buffer, now)?;
                rmp_serde::encode::write_named(&mut buffer, record)?;
                return Ok(buffer.into_inner().freeze());
            }
            WireFormat::ForwardJson => {
                serde_json::to_writer(&mut buffer, &(tag, &self.json_time(now), record))?;
            }
            WireFormat::JsonLines => {
                // Fields already present in the record win over the injected ones
                let mut line = record.as_map().clone();
                line.entry("tag").or_insert_with(|| Value::String(tag.to_string()));
                line.entry("time").or_insert_with(|| self.json_time(now));
                serde_json::to_writer(&mut buffer, &line)?;
            }
        }

        let mut buffer = buffer.into_inner();
        buffer.put_u8(b'\n');
        Ok(buffer.freeze())
    }

    fn write_msgpack_time<W: std::io::Write>(
        &self,
        out: &mut W,
        now: DateTime<Utc>,
    ) -> Result<(), SerializationError> {
        if self.sub_second_precision {
            rmp::encode::write_ext_meta(out, EVENT_TIME_LEN, EVENT_TIME_EXT_TYPE)?;
            out.write_all(&(now.timestamp() as u32).to_be_bytes())?;
            out.write_all(&now.timestamp_subsec_nanos().to_be_bytes())?;
        } else {
            rmp::encode::write_sint(out, now.timestamp())?;
        }
        Ok(())
    }

    fn json_time(&self, now: DateTime<Utc>) -> Value {
        if self.sub_second_precision {
            Value::from(now.timestamp_micros() as f64 / 1_000_000.0)
        } else {
            Value::from(now.timestamp())
        }
    }
}

impl Default for EntryEncoder {
    fn default() -> Self {
        Self::new(WireFormat::default(), false)
    }
}
