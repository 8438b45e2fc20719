//! Syntactic validation of paths, values and Set operations.
//!
//! Validation runs before any lock is taken or network activity happens,
//! and its failures are permanent by definition. Only syntax is checked
//! here; the full path grammar of the data model is the device's business.

use crate::encoding::Encoding;
use crate::request::{SetOperation, SetOperationKind};
use thiserror::Error;

/// Maximum size of a single value in bytes.
pub const MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum length of a gNMI path in characters.
pub const MAX_PATH_LENGTH: usize = 1024;

/// Errors raised by input validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The path list is empty.
    #[error("paths cannot be empty")]
    EmptyPaths,

    /// A path is an empty string.
    #[error("path cannot be empty (at index {index})")]
    EmptyPath {
        /// Index in the path list.
        index: usize,
    },

    /// A path exceeds [`MAX_PATH_LENGTH`].
    #[error("path at index {index} exceeds maximum length of {MAX_PATH_LENGTH} characters: {path}")]
    PathTooLong {
        /// Index in the path list.
        index: usize,
        /// Truncated path for the message.
        path: String,
    },

    /// A path is neither absolute nor module-qualified.
    #[error("path at index {index} must start with '/' or be module-qualified (module:/path): {path}")]
    BadPathFormat {
        /// Index in the path list.
        index: usize,
        /// Offending path.
        path: String,
    },

    /// A path contains a NUL byte.
    #[error("path at index {index} contains null byte at position {position}")]
    NulByte {
        /// Index in the path list.
        index: usize,
        /// Byte offset of the NUL.
        position: usize,
    },

    /// A path contains a `/../` traversal pattern.
    #[error("path at index {index} contains suspicious traversal pattern '/../' at position {position}")]
    Traversal {
        /// Index in the path list.
        index: usize,
        /// Byte offset of the pattern.
        position: usize,
    },

    /// The operation list is empty.
    #[error("operations cannot be empty")]
    EmptyOperations,

    /// A value exceeds [`MAX_VALUE_SIZE`].
    #[error("operation at index {index}: value size exceeds maximum of {MAX_VALUE_SIZE} bytes (got {size} bytes)")]
    ValueTooLarge {
        /// Index in the operation list.
        index: usize,
        /// Actual value size in bytes.
        size: usize,
    },

    /// A JSON value failed the lightweight syntax check.
    #[error("operation at index {index}: invalid JSON syntax: {reason}")]
    InvalidJson {
        /// Index in the operation list.
        index: usize,
        /// What the syntax check tripped on.
        reason: JsonSyntaxError,
    },
}

/// Outcome of the lightweight JSON syntax check.
///
/// Deliberately not a full parse; values can be 10 MiB and only obvious
/// damage needs to be caught before it reaches the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JsonSyntaxError {
    /// The first character cannot start a JSON document.
    #[error("JSON must start with '{{', '[', '\"', or a JSON literal")]
    BadStart,
    /// More closing braces than opening ones.
    #[error("unbalanced braces: too many '}}'")]
    ExtraClosingBrace,
    /// More closing brackets than opening ones.
    #[error("unbalanced brackets: too many ']'")]
    ExtraClosingBracket,
    /// Unclosed braces at end of input.
    #[error("unbalanced braces: {0} unclosed '{{'")]
    UnclosedBraces(usize),
    /// Unclosed brackets at end of input.
    #[error("unbalanced brackets: {0} unclosed '['")]
    UnclosedBrackets(usize),
    /// A string literal never terminates.
    #[error("unterminated string")]
    UnterminatedString,
}

/// Validate a list of gNMI paths.
pub fn validate_paths<S: AsRef<str>>(paths: &[S]) -> Result<(), ValidationError> {
    if paths.is_empty() {
        return Err(ValidationError::EmptyPaths);
    }
    for (index, path) in paths.iter().enumerate() {
        validate_path(index, path.as_ref())?;
    }
    Ok(())
}

fn validate_path(index: usize, path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::EmptyPath { index });
    }
    if path.len() > MAX_PATH_LENGTH {
        return Err(ValidationError::PathTooLong {
            index,
            path: truncate(path),
        });
    }
    if !is_valid_path(path) {
        return Err(ValidationError::BadPathFormat {
            index,
            path: truncate(path),
        });
    }
    if let Some(position) = path.bytes().position(|b| b == 0) {
        return Err(ValidationError::NulByte { index, position });
    }
    if let Some(position) = path.find("/../") {
        return Err(ValidationError::Traversal { index, position });
    }
    Ok(())
}

/// Validate a list of Set operations.
pub fn validate_set_operations(ops: &[SetOperation]) -> Result<(), ValidationError> {
    if ops.is_empty() {
        return Err(ValidationError::EmptyOperations);
    }
    for (index, op) in ops.iter().enumerate() {
        validate_path(index, &op.path)?;
        if matches!(op.kind, SetOperationKind::Update | SetOperationKind::Replace) {
            validate_value(index, &op.value, op.encoding)?;
        }
    }
    Ok(())
}

/// Validate a value for an update/replace operation.
pub fn validate_value(
    index: usize,
    value: &str,
    encoding: Encoding,
) -> Result<(), ValidationError> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(ValidationError::ValueTooLarge {
            index,
            size: value.len(),
        });
    }
    if encoding.is_json() {
        check_json_syntax(value).map_err(|reason| ValidationError::InvalidJson { index, reason })?;
    }
    Ok(())
}

/// Paths are either absolute (`/...`) or module-qualified
/// (`module-name:/...`).
fn is_valid_path(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    match path.split_once(':') {
        Some((module, rest)) => !module.is_empty() && rest.starts_with('/'),
        None => false,
    }
}

/// Lightweight JSON syntax check: first-character class, balanced braces
/// and brackets outside strings, terminated strings. Empty values pass;
/// some operations legitimately send none.
fn check_json_syntax(value: &str) -> Result<(), JsonSyntaxError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    let first = trimmed.as_bytes()[0];
    let literal_start = matches!(first, b'{' | b'[' | b'"' | b't' | b'f' | b'n' | b'-')
        || first.is_ascii_digit();
    if !literal_start {
        return Err(JsonSyntaxError::BadStart);
    }

    let mut braces = 0usize;
    let mut brackets = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for byte in trimmed.bytes() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => braces += 1,
            b'}' if !in_string => {
                braces = braces
                    .checked_sub(1)
                    .ok_or(JsonSyntaxError::ExtraClosingBrace)?;
            }
            b'[' if !in_string => brackets += 1,
            b']' if !in_string => {
                brackets = brackets
                    .checked_sub(1)
                    .ok_or(JsonSyntaxError::ExtraClosingBracket)?;
            }
            _ => {}
        }
    }

    if braces > 0 {
        return Err(JsonSyntaxError::UnclosedBraces(braces));
    }
    if brackets > 0 {
        return Err(JsonSyntaxError::UnclosedBrackets(brackets));
    }
    if in_string {
        return Err(JsonSyntaxError::UnterminatedString);
    }
    Ok(())
}

/// Truncate a path for error messages.
fn truncate(path: &str) -> String {
    const LIMIT: usize = 100;
    if path.len() <= LIMIT {
        path.to_string()
    } else {
        let mut end = LIMIT;
        while !path.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &path[..end])
    }
}
