//! Per-call options and Set operation descriptors.

use crate::encoding::Encoding;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Per-call override bag.
///
/// Scoped to a single operation. Later setters win on conflicting fields.
///
/// # Example
///
/// ```
/// use gnmi_client::CallOptions;
/// use gnmi_client::Encoding;
/// use std::time::Duration;
///
/// let options = CallOptions::default()
///     .with_timeout(Duration::from_secs(30))
///     .with_encoding(Encoding::Proto);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Explicit per-attempt timeout, overriding the scope deadline and the
    /// client default.
    pub timeout: Option<Duration>,
    /// Value encoding, overriding the default `json_ietf`.
    pub encoding: Option<Encoding>,
}

impl CallOptions {
    /// Set an explicit per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the value encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }
}

/// Kind of a single Set operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetOperationKind {
    /// Modify existing configuration, creating it if absent.
    Update,
    /// Remove existing configuration before applying the new value.
    Replace,
    /// Remove configuration at the path.
    Delete,
}

impl SetOperationKind {
    /// Lowercase name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SetOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single Set operation: update, replace or delete at one path.
///
/// Immutable once constructed; validated before any network activity.
///
/// # Example
///
/// ```
/// use gnmi_client::SetOperation;
///
/// let ops = vec![
///     SetOperation::update("/system/config/hostname", r#"{"hostname": "router1"}"#),
///     SetOperation::delete("/interfaces/interface[name=Gi0/0/0/1]/config"),
/// ];
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOperation {
    /// Operation kind.
    pub kind: SetOperationKind,
    /// gNMI path the operation applies to.
    pub path: String,
    /// JSON value for update/replace; empty for delete.
    pub value: String,
    /// Value encoding.
    pub encoding: Encoding,
}

impl SetOperation {
    /// Build an update operation with the default `json_ietf` encoding.
    #[must_use]
    pub fn update(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: SetOperationKind::Update,
            path: path.into(),
            value: value.into(),
            encoding: Encoding::JsonIetf,
        }
    }

    /// Build a replace operation with the default `json_ietf` encoding.
    #[must_use]
    pub fn replace(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: SetOperationKind::Replace,
            path: path.into(),
            value: value.into(),
            encoding: Encoding::JsonIetf,
        }
    }

    /// Build a delete operation.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            kind: SetOperationKind::Delete,
            path: path.into(),
            value: String::new(),
            encoding: Encoding::JsonIetf,
        }
    }

    /// Override the value encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_options_later_wins() {
        let options = CallOptions::default()
            .with_timeout(Duration::from_secs(5))
            .with_timeout(Duration::from_secs(9))
            .with_encoding(Encoding::Json)
            .with_encoding(Encoding::Proto);
        assert_eq!(options.timeout, Some(Duration::from_secs(9)));
        assert_eq!(options.encoding, Some(Encoding::Proto));
    }

    #[test]
    fn test_update_defaults() {
        let op = SetOperation::update("/system/config/hostname", r#"{"hostname": "r1"}"#);
        assert_eq!(op.kind, SetOperationKind::Update);
        assert_eq!(op.encoding, Encoding::JsonIetf);
    }

    #[test]
    fn test_delete_has_empty_value() {
        let op = SetOperation::delete("/system/config/motd-banner");
        assert_eq!(op.kind, SetOperationKind::Delete);
        assert!(op.value.is_empty());
    }

    #[test]
    fn test_encoding_override() {
        let op = SetOperation::replace("/x", "raw").with_encoding(Encoding::Ascii);
        assert_eq!(op.encoding, Encoding::Ascii);
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&SetOperationKind::Replace).unwrap(),
            "\"replace\""
        );
    }
}
