//! Fluent JSON body builder for Set payloads.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Largest array index a dotted path may address. Arrays are padded with
/// `null` up to the index, so an unbounded index would let one malformed
/// path allocate gigabytes.
pub const MAX_ARRAY_INDEX: usize = 10_000;

/// Errors raised while building a body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// A value could not be serialized to JSON.
    #[error("set({path:?}): {source}")]
    Serialize {
        /// Path the value was destined for.
        path: String,
        /// Underlying serialization error.
        source: serde_json::Error,
    },

    /// A path segment is empty.
    #[error("{op}({path:?}): empty path segment")]
    EmptySegment {
        /// Operation that failed.
        op: &'static str,
        /// Offending path.
        path: String,
    },

    /// A numeric segment exceeds [`MAX_ARRAY_INDEX`].
    #[error("{op}({path:?}): array index {index} exceeds maximum of {MAX_ARRAY_INDEX}")]
    IndexTooLarge {
        /// Operation that failed.
        op: &'static str,
        /// Offending path.
        path: String,
        /// The rejected index.
        index: usize,
    },
}

/// Builder for JSON configuration payloads addressed by dotted paths.
///
/// Numeric segments index arrays, which are padded with `null` as needed;
/// everything else traverses or creates objects. The first error is
/// carried through the chain and surfaced by [`Body::build`] or
/// [`Body::err`]; once an error occurs, later calls are no-ops.
///
/// # Example
///
/// ```
/// use gnmi_client::Body;
///
/// let value = Body::default()
///     .set("config.name", "GigabitEthernet0/0/0/0")
///     .set("config.mtu", 9000)
///     .set("config.enabled", true)
///     .build()
///     .unwrap();
/// assert!(value.contains("\"mtu\":9000"));
/// ```
#[derive(Debug, Default)]
pub struct Body {
    root: Value,
    err: Option<BodyError>,
}

impl Body {
    /// Set a value at a dotted path, creating intermediate containers.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Serialize) -> Self {
        if self.err.is_some() {
            return self;
        }
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(source) => {
                self.err = Some(BodyError::Serialize {
                    path: path.to_string(),
                    source,
                });
                return self;
            }
        };
        if let Err(err) = set_at(&mut self.root, path, value) {
            self.err = Some(err);
        }
        self
    }

    /// Remove the value at a dotted path. Missing paths are a no-op.
    #[must_use]
    pub fn delete(mut self, path: &str) -> Self {
        if self.err.is_some() {
            return self;
        }
        if let Err(err) = delete_at(&mut self.root, path) {
            self.err = Some(err);
        }
        self
    }

    /// The first error encountered while building, if any.
    #[must_use]
    pub fn err(&self) -> Option<&BodyError> {
        self.err.as_ref()
    }

    /// Finish the chain, returning the serialized JSON document.
    pub fn build(self) -> Result<String, BodyError> {
        match self.err {
            Some(err) => Err(err),
            // Serializing a Value cannot fail.
            None => Ok(serde_json::to_string(&self.root).unwrap_or_default()),
        }
    }

    /// Finish the chain, returning the JSON tree.
    pub fn into_value(self) -> Result<Value, BodyError> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.root),
        }
    }
}

fn split_segments<'a>(
    op: &'static str,
    path: &'a str,
) -> Result<Vec<&'a str>, BodyError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(BodyError::EmptySegment {
            op,
            path: path.to_string(),
        });
    }
    Ok(segments)
}

fn set_at(root: &mut Value, path: &str, value: Value) -> Result<(), BodyError> {
    let segments = split_segments("set", path)?;
    let mut current = root;
    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        let is_last = i == last;
        if let Ok(index) = segment.parse::<usize>() {
            if index > MAX_ARRAY_INDEX {
                return Err(BodyError::IndexTooLarge {
                    op: "set",
                    path: path.to_string(),
                    index,
                });
            }
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            let Value::Array(items) = current else {
                return Ok(());
            };
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            if is_last {
                items[index] = value;
                return Ok(());
            }
            current = &mut items[index];
        } else {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                return Ok(());
            };
            if is_last {
                map.insert((*segment).to_string(), value);
                return Ok(());
            }
            current = map.entry((*segment).to_string()).or_insert(Value::Null);
        }
    }
    Ok(())
}

fn delete_at(root: &mut Value, path: &str) -> Result<(), BodyError> {
    let segments = split_segments("delete", path)?;
    let mut current = root;
    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        let is_last = i == last;
        match (segment.parse::<usize>(), &mut *current) {
            (Ok(index), Value::Array(items)) => {
                if index >= items.len() {
                    return Ok(());
                }
                if is_last {
                    items.remove(index);
                    return Ok(());
                }
                current = &mut items[index];
            }
            (Err(_), Value::Object(map)) => {
                if is_last {
                    map.remove(*segment);
                    return Ok(());
                }
                match map.get_mut(*segment) {
                    Some(next) => current = next,
                    None => return Ok(()),
                }
            }
            _ => return Ok(()),
        }
    }
    Ok(())
}
