#![warn(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Durations and sizes stay within realistic bounds
    clippy::cast_precision_loss,      // Sub-second timestamps only
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. SinkError in sink module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod domain;
pub mod sender;
pub mod sink;
pub mod transform;

// Re-export main types for easy access
pub use app::{App, Config};
pub use domain::{Event, TransportRecord};
pub use sink::{FluentSink, SinkError, SinkSettings, SinkState};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
