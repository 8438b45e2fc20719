//! Log preparation and sensitive-value redaction.
//!
//! Request and response payloads are only ever logged through
//! [`prepare_json_for_logging`], which caps the input size, caps the
//! number of redaction operations and replaces sensitive string fields
//! with a placeholder before the payload reaches a log line.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Maximum payload size processed for logging.
pub const MAX_JSON_SIZE_FOR_LOGGING: usize = 1024 * 1024;

/// Maximum number of sensitive fields redacted in one payload.
pub const MAX_SENSITIVE_FIELDS: usize = 1000;

/// Placeholder for payloads above [`MAX_JSON_SIZE_FOR_LOGGING`].
pub const JSON_TOO_LARGE_MESSAGE: &str = "[JSON TOO LARGE FOR LOGGING]";

/// Placeholder for payloads above [`MAX_SENSITIVE_FIELDS`].
pub const JSON_TOO_MANY_SENSITIVE_MESSAGE: &str = "[JSON CONTAINS TOO MANY SENSITIVE FIELDS]";

const SENSITIVE_KEYS: [&str; 6] = ["password", "secret", "key", "community", "token", "auth"];

fn redaction_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Flexible whitespace around the colon per RFC 8259.
        Regex::new(r#""(password|secret|key|community|token|auth)"\s*:\s*"[^"]*""#)
            .unwrap_or_else(|err| panic!("invalid redaction pattern: {err}"))
    })
}

/// Replace sensitive string fields with `[REDACTED]`.
#[must_use]
pub fn redact_sensitive_data(json: &str) -> String {
    redaction_pattern()
        .replace_all(json, "\"$1\":\"[REDACTED]\"")
        .into_owned()
}

fn count_sensitive_fields(json: &str) -> usize {
    SENSITIVE_KEYS
        .iter()
        .map(|key| json.matches(&format!("\"{key}\"")).count())
        .sum()
}

/// Redact and format a JSON payload for logging.
///
/// Oversized payloads and payloads with an excessive number of sensitive
/// fields are replaced by a placeholder outright; both limits keep regex
/// work on hostile input bounded. Pretty-printing is best-effort: input
/// that fails to parse is logged in redacted raw form.
#[must_use]
pub fn prepare_json_for_logging(json: &str, pretty: bool) -> String {
    if json.len() > MAX_JSON_SIZE_FOR_LOGGING {
        return JSON_TOO_LARGE_MESSAGE.to_string();
    }

    let sensitive = count_sensitive_fields(json);
    if sensitive > MAX_SENSITIVE_FIELDS {
        warn!(
            count = sensitive,
            max = MAX_SENSITIVE_FIELDS,
            "too many sensitive fields in payload"
        );
        return JSON_TOO_MANY_SENSITIVE_MESSAGE.to_string();
    }

    let redacted = redact_sensitive_data(json);

    if pretty {
        match serde_json::from_str::<serde_json::Value>(&redacted) {
            Ok(value) => {
                if let Ok(formatted) = serde_json::to_string_pretty(&value) {
                    return formatted;
                }
            }
            Err(err) => {
                debug!(error = %err, "JSON pretty-print failed, using raw redacted output");
            }
        }
    }

    redacted
}
