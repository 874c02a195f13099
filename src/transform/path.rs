//! Field selectors into the canonical JSON tree of an event.
//!
//! Grammar: `$` followed by one or more of `.key`, `[index]`, `["quoted key"]`
//! or `['quoted key']`. Quoted keys may contain dots and slashes, which is
//! how label keys such as `app.kubernetes.io/name` are addressed. A selector
//! may also start directly with `.` (template style, `.InvolvedObject.Name`).

use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty field selector")]
    Empty,
    #[error("selector '{path}' must start with '$' or '.'")]
    MissingRoot { path: String },
    #[error("empty segment at offset {offset} in '{path}'")]
    EmptySegment { path: String, offset: usize },
    #[error("unexpected character {found:?} at offset {offset} in '{path}'")]
    UnexpectedChar { path: String, offset: usize, found: char },
    #[error("unterminated bracket in '{path}'")]
    UnterminatedBracket { path: String },
    #[error("invalid array index '{index}' in '{path}'")]
    InvalidIndex { path: String, index: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// `.name`: exact match first, then ASCII case-insensitive
    Key(String),
    /// `["name"]`: exact match only
    Quoted(String),
    Index(usize),
}

/// Maps holding user data. Their keys are case-sensitive, so nothing below
/// them falls back to case-insensitive matching.
const USER_MAPS: [&str; 2] = ["labels", "annotations"];

/// A parsed selector. An empty segment list selects the whole tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Parse `$.a.b[0]["c.d"]` or `.a.b`. A lone `.` selects the root.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let path = input.trim();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if path == "." {
            return Ok(Self::root());
        }

        let rest = if let Some(rest) = path.strip_prefix('$') {
            if rest.is_empty() {
                return Err(PathError::EmptySegment { path: path.to_string(), offset: 1 });
            }
            rest
        } else if path.starts_with('.') {
            path
        } else {
            return Err(PathError::MissingRoot { path: path.to_string() });
        };
        let base = path.len() - rest.len();

        let chars: Vec<(usize, char)> = rest.char_indices().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let (offset, c) = chars[i];
            match c {
                '.' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && !matches!(chars[end].1, '.' | '[') {
                        let (at, ch) = chars[end];
                        if ch.is_whitespace() || matches!(ch, ']' | '"' | '\'') {
                            return Err(PathError::UnexpectedChar {
                                path: path.to_string(),
                                offset: base + at,
                                found: ch,
                            });
                        }
                        end += 1;
                    }
                    if end == start {
                        return Err(PathError::EmptySegment {
                            path: path.to_string(),
                            offset: base + offset + 1,
                        });
                    }
                    let key: String = chars[start..end].iter().map(|(_, ch)| ch).collect();
                    segments.push(PathSegment::Key(key));
                    i = end;
                }
                '[' => {
                    let close = chars[i + 1..]
                        .iter()
                        .position(|(_, ch)| *ch == ']')
                        .map(|p| p + i + 1)
                        .ok_or_else(|| PathError::UnterminatedBracket { path: path.to_string() })?;
                    let inner: String = chars[i + 1..close].iter().map(|(_, ch)| ch).collect();
                    segments.push(parse_bracket(path, &inner)?);
                    i = close + 1;
                }
                other => {
                    return Err(PathError::UnexpectedChar {
                        path: path.to_string(),
                        offset: base + offset,
                        found: other,
                    });
                }
            }
        }

        Ok(Self { segments })
    }

    /// Look the selector up in `root`. Missing keys, out-of-range indexes and
    /// descending into scalars all yield `None`.
    ///
    /// Dotted keys fall back to a case-insensitive match so template-style
    /// selectors reach the camelCase fields. Quoted keys, and every key below
    /// a `labels` or `annotations` map, must match exactly.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        let mut exact_only = false;

        for segment in &self.segments {
            current = match (segment, current) {
                (PathSegment::Quoted(key), Value::Object(map)) => map.get(key)?,
                (PathSegment::Key(key), Value::Object(map)) if exact_only => map.get(key)?,
                (PathSegment::Key(key), Value::Object(map)) => map.get(key).or_else(|| {
                    map.iter()
                        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
                        .map(|(_, value)| value)
                })?,
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
                _ => return None,
            };

            if let PathSegment::Key(key) | PathSegment::Quoted(key) = segment {
                exact_only |= USER_MAPS.iter().any(|name| name.eq_ignore_ascii_case(key));
            }
        }

        Some(current)
    }
}

fn parse_bracket(path: &str, inner: &str) -> Result<PathSegment, PathError> {
    let trimmed = inner.trim();
    for quote in ['"', '\''] {
        if let Some(body) = trimmed.strip_prefix(quote) {
            return match body.strip_suffix(quote) {
                Some(key) if !key.is_empty() => Ok(PathSegment::Quoted(key.to_string())),
                Some(_) => Err(PathError::EmptySegment { path: path.to_string(), offset: 0 }),
                None => Err(PathError::UnterminatedBracket { path: path.to_string() }),
            };
        }
    }
    trimmed
        .parse::<usize>()
        .map(PathSegment::Index)
        .map_err(|_| PathError::InvalidIndex {
            path: path.to_string(),
            index: inner.to_string(),
        })
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Quoted(key) => write!(f, "[\"{key}\"]")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
