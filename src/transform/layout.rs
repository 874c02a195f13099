//! Layout templates: user-declared output shapes filled from event fields.
//!
//! A template is compiled once from its raw mapping. Every string value is
//! classified:
//!
//! - `$.reason`, `$.involvedObject.labels["app"]`: a field reference. The
//!   resolved value keeps its JSON type; an absent field drops the key.
//! - `"{{ .InvolvedObject.Name }} was {{ .Reason }}"`: text with
//!   placeholders. Always renders to a string; absent fields render empty.
//! - `$$...`: escaped literal, emitted with a single leading `$`.
//! - anything else: literal.
//!
//! Objects and arrays nest arbitrarily; non-string scalars are literals.

use super::path::{FieldPath, PathError};
use crate::domain::{Event, TransportRecord};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

const PLACEHOLDER: &str = r"\{\{-?\s*(.*?)\s*-?\}\}";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("invalid field selector for '{key}': {source}")]
    InvalidPath {
        key: String,
        #[source]
        source: PathError,
    },
    #[error("unterminated placeholder for '{key}'")]
    UnterminatedPlaceholder { key: String },
    #[error("layout must be a mapping, got {0}")]
    NotAMapping(String),
    #[error("failed to serialize event: {0}")]
    Serialize(String),
    #[error("placeholder pattern failed to compile: {0}")]
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextSegment {
    Text(String),
    Field(FieldPath),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    Literal(Value),
    FieldRef(FieldPath),
    Interpolated(Vec<TextSegment>),
    Map(Vec<(String, LayoutNode)>),
    List(Vec<LayoutNode>),
}

/// Compiled layout. Immutable after construction and cheap to share.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTemplate {
    entries: Vec<(String, LayoutNode)>,
}

impl LayoutTemplate {
    pub fn compile(raw: &Map<String, Value>) -> Result<Self, LayoutError> {
        let entries = compile_entries("", raw)?;
        Ok(Self { entries })
    }

    pub fn from_value(raw: &Value) -> Result<Self, LayoutError> {
        match raw {
            Value::Object(map) => Self::compile(map),
            other => Err(LayoutError::NotAMapping(other.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Project `event` into a transport record.
    pub fn render(&self, event: &Event) -> Result<TransportRecord, LayoutError> {
        let tree = event
            .to_json_value()
            .map_err(|e| LayoutError::Serialize(e.to_string()))?;
        Ok(self.render_tree(&tree))
    }

    /// Project an already serialized event tree.
    pub fn render_tree(&self, tree: &Value) -> TransportRecord {
        TransportRecord::from(resolve_entries(&self.entries, tree))
    }
}

/// Compile `layout` and render it against `event` in one step.
pub fn convert_layout_template(
    layout: &Map<String, Value>,
    event: &Event,
) -> Result<TransportRecord, LayoutError> {
    LayoutTemplate::compile(layout)?.render(event)
}

fn placeholder_pattern() -> Result<&'static Regex, LayoutError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(PLACEHOLDER))
        .as_ref()
        .map_err(|e| LayoutError::Pattern(e.to_string()))
}

fn child_key(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn compile_entries(
    parent: &str,
    raw: &Map<String, Value>,
) -> Result<Vec<(String, LayoutNode)>, LayoutError> {
    raw.iter()
        .map(|(key, value)| {
            let node = compile_node(&child_key(parent, key), value)?;
            Ok((key.clone(), node))
        })
        .collect()
}

fn compile_node(key: &str, value: &Value) -> Result<LayoutNode, LayoutError> {
    match value {
        Value::String(text) => compile_string(key, text),
        Value::Object(map) => Ok(LayoutNode::Map(compile_entries(key, map)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| compile_node(&format!("{key}[{index}]"), item))
            .collect::<Result<Vec<_>, _>>()
            .map(LayoutNode::List),
        literal => Ok(LayoutNode::Literal(literal.clone())),
    }
}

fn compile_string(key: &str, text: &str) -> Result<LayoutNode, LayoutError> {
    if let Some(rest) = text.strip_prefix("$$") {
        return Ok(LayoutNode::Literal(Value::String(format!("${rest}"))));
    }
    if text.starts_with("$.") || text.starts_with("$[") {
        return FieldPath::parse(text)
            .map(LayoutNode::FieldRef)
            .map_err(|source| LayoutError::InvalidPath { key: key.to_string(), source });
    }
    if text.contains("{{") {
        return compile_interpolated(key, text);
    }
    Ok(LayoutNode::Literal(Value::String(text.to_string())))
}

fn compile_interpolated(key: &str, text: &str) -> Result<LayoutNode, LayoutError> {
    let pattern = placeholder_pattern()?;
    let mut segments = Vec::new();
    let mut last = 0;

    for captures in pattern.captures_iter(text) {
        let Some(whole) = captures.get(0) else { continue };
        push_text(key, &mut segments, &text[last..whole.start()])?;
        let expr = captures.get(1).map_or("", |m| m.as_str());
        let path = FieldPath::parse(expr)
            .map_err(|source| LayoutError::InvalidPath { key: key.to_string(), source })?;
        segments.push(TextSegment::Field(path));
        last = whole.end();
    }
    push_text(key, &mut segments, &text[last..])?;

    Ok(LayoutNode::Interpolated(segments))
}

fn push_text(key: &str, segments: &mut Vec<TextSegment>, text: &str) -> Result<(), LayoutError> {
    if text.contains("{{") {
        return Err(LayoutError::UnterminatedPlaceholder { key: key.to_string() });
    }
    if !text.is_empty() {
        segments.push(TextSegment::Text(text.to_string()));
    }
    Ok(())
}

fn resolve_entries(entries: &[(String, LayoutNode)], tree: &Value) -> Map<String, Value> {
    entries
        .iter()
        .filter_map(|(key, node)| resolve_node(node, tree).map(|value| (key.clone(), value)))
        .collect()
}

fn resolve_node(node: &LayoutNode, tree: &Value) -> Option<Value> {
    match node {
        LayoutNode::Literal(value) => Some(value.clone()),
        LayoutNode::FieldRef(path) => path.resolve(tree).cloned(),
        LayoutNode::Interpolated(segments) => {
            let mut out = String::new();
            for segment in segments {
                match segment {
                    TextSegment::Text(text) => out.push_str(text),
                    TextSegment::Field(path) => {
                        if let Some(value) = path.resolve(tree) {
                            push_plain(&mut out, value);
                        }
                    }
                }
            }
            Some(Value::String(out))
        }
        LayoutNode::Map(entries) => Some(Value::Object(resolve_entries(entries, tree))),
        LayoutNode::List(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| resolve_node(item, tree).unwrap_or(Value::Null))
                .collect(),
        )),
    }
}

fn push_plain(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(text) => out.push_str(text),
        other => out.push_str(&other.to_string()),
    }
}
