//! Domain layer for fluent-event-sink.
//!
//! Contains the canonical types shared across all modules:
//! - `Event`: The cluster event the sink receives
//! - `TransportRecord`: The resolved mapping handed to the transport

pub mod event;
pub mod record;

pub use event::{Event, EventSource, InvolvedObject, ObjectMeta, OwnerReference, StringMap};
pub use record::{RecordError, TransportRecord};
