//! Response envelopes.
//!
//! Every successful operation returns an envelope with the payload, the
//! response timestamp, an `ok` flag and the number of retries consumed.
//! Failures are returned as [`GnmiError`](crate::error::GnmiError) values
//! carrying the structured failure records, so a caller can never observe
//! a failure without its records.

use crate::request::SetOperationKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single path/value pair inside a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Path the value applies to.
    pub path: String,
    /// Decoded value.
    pub value: Value,
}

/// One gNMI notification message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Device timestamp, nanoseconds since the Unix epoch.
    pub timestamp: i64,
    /// Path prefix applied to all updates and deletes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Updated path/value pairs.
    pub updates: Vec<Update>,
    /// Deleted paths.
    pub deletes: Vec<String>,
}

/// Result of a single Set operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Path the operation applied to.
    pub path: String,
    /// Operation kind performed.
    pub op: SetOperationKind,
}

/// A data model supported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name.
    pub name: String,
    /// Organization publishing the model.
    pub organization: String,
    /// Model version.
    pub version: String,
}

/// Envelope of a successful Get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    /// Notifications returned by the device.
    pub notifications: Vec<Notification>,
    /// Response timestamp, nanoseconds since the Unix epoch.
    pub timestamp: i64,
    /// Always true on the success path.
    pub ok: bool,
    /// Retries consumed before the attempt that succeeded.
    pub retries: u32,
}

/// Envelope of a successful Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResponse {
    /// Per-operation results in request order.
    pub results: Vec<UpdateResult>,
    /// Response timestamp, nanoseconds since the Unix epoch.
    pub timestamp: i64,
    /// Always true on the success path.
    pub ok: bool,
    /// Retries consumed before the attempt that succeeded.
    pub retries: u32,
}

/// Envelope of a successful Capabilities exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitiesResponse {
    /// gNMI service version.
    pub version: String,
    /// Supported capabilities, typically encodings.
    pub capabilities: Vec<String>,
    /// Supported data models.
    pub models: Vec<ModelInfo>,
    /// Always true on the success path.
    pub ok: bool,
    /// Retries consumed before the attempt that succeeded.
    pub retries: u32,
}

/// Query a serialized tree by dotted path; numeric segments index arrays.
fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

macro_rules! impl_envelope_queries {
    ($($ty:ty),+) => {
        $(impl $ty {
            /// Serialized representation of the envelope. Empty string if
            /// serialization fails.
            #[must_use]
            pub fn json(&self) -> String {
                serde_json::to_string(self).unwrap_or_default()
            }

            /// Query the serialized envelope by dotted path.
            ///
            /// Numeric segments index arrays, so
            /// `notifications.0.updates.0.value` reaches the first value of
            /// the first notification.
            #[must_use]
            pub fn value(&self, path: &str) -> Option<Value> {
                let root = serde_json::to_value(self).ok()?;
                lookup(&root, path).cloned()
            }
        })+
    };
}

impl_envelope_queries!(GetResponse, SetResponse, CapabilitiesResponse);
