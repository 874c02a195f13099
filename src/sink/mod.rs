//! The event sink: normalize, project, deliver.
//!
//! ```text
//! Event ──► dedot (optional) ──► layout | passthrough ──► Transport::post
//! ```
//!
//! Every stage failure is returned to the caller wrapped with the stage that
//! produced it. Nothing is retried or logged here; the caller owns both.

use crate::app::config::SinkConfig;
use crate::domain::{Event, TransportRecord};
use crate::sender::{ForwardClient, Transport, TransportError};
use crate::transform::{dedot_event, LayoutError, LayoutTemplate};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("invalid sink configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to create Fluent Bit logger: {0}")]
    Connect(#[source] TransportError),
    #[error("failed to convert layout template: {0}")]
    Layout(#[from] LayoutError),
    #[error("failed to unmarshal JSON data: {0}")]
    Decode(String),
    #[error("failed to send event: {0}")]
    Send(#[source] TransportError),
    #[error("failed to close Fluent Bit logger: {0}")]
    Shutdown(#[source] TransportError),
    #[error("sink is closed")]
    Closed,
}

impl SinkError {
    /// Whether the failure happened in the transport after the record was
    /// built. Only these are worth re-sending the same event for.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, SinkError::Send(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Active,
    Closed,
}

/// What the sink does to each event, independent of the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkSettings {
    pub tag: String,
    pub de_dot: bool,
    pub layout: Option<Map<String, Value>>,
}

#[derive(Debug)]
pub struct FluentSink<T: Transport = ForwardClient> {
    transport: T,
    tag: String,
    de_dot: bool,
    layout: Option<LayoutTemplate>,
    closed: AtomicBool,
}

impl FluentSink<ForwardClient> {
    /// Build the forward client described by `config` and wrap it.
    pub fn connect(config: &SinkConfig) -> Result<Self, SinkError> {
        let transport = ForwardClient::new(config.forward_config()).map_err(SinkError::Connect)?;
        Self::new(config.settings(), transport)
    }
}

impl<T: Transport> FluentSink<T> {
    /// Compile the layout and take ownership of `transport`.
    ///
    /// A malformed layout fails here with [`SinkError::Layout`], so the sink
    /// is never built and `send` never reports a template error. An empty tag
    /// is [`SinkError::InvalidConfiguration`].
    pub fn new(settings: SinkSettings, transport: T) -> Result<Self, SinkError> {
        if settings.tag.trim().is_empty() {
            return Err(SinkError::InvalidConfiguration("tag must not be empty".to_string()));
        }

        let layout = settings
            .layout
            .as_ref()
            .map(LayoutTemplate::compile)
            .transpose()?;

        Ok(Self {
            transport,
            tag: settings.tag,
            de_dot: settings.de_dot,
            layout,
            closed: AtomicBool::new(false),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn de_dot(&self) -> bool {
        self.de_dot
    }

    pub fn layout(&self) -> Option<&LayoutTemplate> {
        self.layout.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn state(&self) -> SinkState {
        if self.closed.load(Ordering::Acquire) {
            SinkState::Closed
        } else {
            SinkState::Active
        }
    }

    /// Build the record `send` would post, without posting it.
    pub fn transform(&self, event: &Event) -> Result<TransportRecord, SinkError> {
        let event = if self.de_dot {
            Cow::Owned(dedot_event(event))
        } else {
            Cow::Borrowed(event)
        };

        match &self.layout {
            Some(layout) => Ok(layout.render(&event)?),
            None => passthrough(&event),
        }
    }

    /// Transform `event` and post it under the configured tag.
    pub async fn send(&self, event: &Event) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }

        let record = self.transform(event)?;
        self.transport
            .post(&self.tag, &record)
            .await
            .map_err(SinkError::Send)
    }

    /// Release the transport. The sink is closed afterwards even when the
    /// transport reports a failure.
    pub async fn close(&self) -> Result<(), SinkError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(SinkError::Closed);
        }

        self.transport.close().await.map_err(SinkError::Shutdown)
    }
}

fn passthrough(event: &Event) -> Result<TransportRecord, SinkError> {
    let value = event
        .to_json_value()
        .map_err(|e| SinkError::Decode(e.to_string()))?;
    TransportRecord::try_from(value).map_err(|e| SinkError::Decode(e.to_string()))
}
