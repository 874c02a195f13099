//! Key normalization for storage backends that treat `.` in field names as
//! object nesting (Elasticsearch, OpenSearch, ...).

use crate::domain::{Event, StringMap};
use std::borrow::Cow;

const ILLEGAL: char = '.';
const REPLACEMENT: &str = "_";

/// Replace every `.` in `key` with `_`. Borrows when there is nothing to do.
pub fn dedot_key(key: &str) -> Cow<'_, str> {
    if key.contains(ILLEGAL) {
        Cow::Owned(key.replace(ILLEGAL, REPLACEMENT))
    } else {
        Cow::Borrowed(key)
    }
}

/// Rewrite the keys of a label or annotation map.
///
/// Keys are visited in ascending order, so when two keys collide after
/// rewriting, the value of the greatest original key wins.
pub fn dedot_map(map: &StringMap) -> StringMap {
    map.iter()
        .map(|(key, value)| (dedot_key(key).into_owned(), value.clone()))
        .collect()
}

/// Copy of `event` with de-dotted label and annotation keys on both the
/// event metadata and the involved object. The input is left untouched.
pub fn dedot_event(event: &Event) -> Event {
    let mut out = event.clone();
    out.metadata.labels = dedot_map(&event.metadata.labels);
    out.metadata.annotations = dedot_map(&event.metadata.annotations);
    out.involved_object.labels = dedot_map(&event.involved_object.labels);
    out.involved_object.annotations = dedot_map(&event.involved_object.annotations);
    out
}
