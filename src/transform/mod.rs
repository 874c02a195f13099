//! Event transformation stages that run before delivery.
//!
//! - `dedot`: label/annotation key normalization
//! - `layout`: template projection into a custom record shape
//! - `path`: field selectors used by layout templates

pub mod dedot;
pub mod layout;
pub mod path;

pub use dedot::{dedot_event, dedot_key, dedot_map};
pub use layout::{convert_layout_template, LayoutError, LayoutNode, LayoutTemplate, TextSegment};
pub use path::{FieldPath, PathError, PathSegment};
