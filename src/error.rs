//! Error types and failure classification.
//!
//! Failures fall into six families: configuration errors (from the
//! constructor), validation errors (before any network activity), transient
//! remote errors (retried with backoff), permanent remote errors (surfaced
//! immediately), cancellation errors and reconnection failures. Remote
//! failures carry the gRPC status code reported by the transport; the
//! classification of a status code into transient/permanent and
//! broken/healthy lives on [`TransportError::classify`].

use crate::context::CancelCause;
use crate::validate::ValidationError;
use std::fmt;
use thiserror::Error;

/// gRPC status codes as reported by the transport.
///
/// Only the numeric code is ever interpreted by the client; the wire
/// representation stays behind the [`Transport`](crate::transport::Transport)
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StatusCode {
    /// The operation was cancelled by the caller.
    Cancelled = 1,
    /// Unknown error.
    Unknown = 2,
    /// The client specified an invalid argument.
    InvalidArgument = 3,
    /// The deadline expired before the operation could complete.
    DeadlineExceeded = 4,
    /// The requested entity was not found.
    NotFound = 5,
    /// The entity already exists.
    AlreadyExists = 6,
    /// The caller does not have permission.
    PermissionDenied = 7,
    /// A resource has been exhausted (rate limiting, quota).
    ResourceExhausted = 8,
    /// The system is not in a state required for the operation.
    FailedPrecondition = 9,
    /// The operation was aborted (transaction conflict, may succeed on retry).
    Aborted = 10,
    /// The operation was attempted past the valid range.
    OutOfRange = 11,
    /// The operation is not implemented.
    Unimplemented = 12,
    /// Internal error. Deliberately treated as permanent: it is a catch-all
    /// that often indicates a real bug, and blind retry would mask it.
    Internal = 13,
    /// The service is currently unavailable.
    Unavailable = 14,
    /// Unrecoverable data loss or corruption.
    DataLoss = 15,
    /// The request does not have valid authentication credentials.
    Unauthenticated = 16,
}

impl StatusCode {
    /// Numeric value of the status code.
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Canonical name of the status code.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
            Self::InvalidArgument => "invalid argument",
            Self::DeadlineExceeded => "deadline exceeded",
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::PermissionDenied => "permission denied",
            Self::ResourceExhausted => "resource exhausted",
            Self::FailedPrecondition => "failed precondition",
            Self::Aborted => "aborted",
            Self::OutOfRange => "out of range",
            Self::Unimplemented => "unimplemented",
            Self::Internal => "internal",
            Self::Unavailable => "unavailable",
            Self::DataLoss => "data loss",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureClass {
    /// Whether the failure is likely to succeed on retry.
    pub transient: bool,
    /// Whether the physical connection is likely unusable and should be
    /// torn down and recreated before the next retry.
    pub transport_broken: bool,
}

/// A failure reported by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A remote call failed with a gRPC status.
    #[error("{code}: {message}")]
    Status {
        /// Status code reported by the server or the transport stack.
        code: StatusCode,
        /// Status message.
        message: String,
    },

    /// Establishing the physical connection failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// A transport-local failure with no status code.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TransportError {
    /// Create a status failure.
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Create a connect failure.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect(message.into())
    }

    /// Status failure for a per-attempt deadline that elapsed locally.
    pub(crate) fn attempt_deadline(timeout: std::time::Duration) -> Self {
        Self::Status {
            code: StatusCode::DeadlineExceeded,
            message: format!("attempt timed out after {timeout:?}"),
        }
    }

    /// The status code carried by this failure, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Classify this failure as transient/permanent and broken/healthy.
    ///
    /// The transient allow-list is `Unavailable`, `ResourceExhausted`,
    /// `DeadlineExceeded` and `Aborted`; every other code is permanent.
    /// Only `Unavailable` and `DeadlineExceeded` signal a broken transport.
    /// Failures without a status code (local errors, failed dials) are
    /// permanent and never trigger reconnection.
    #[must_use]
    pub fn classify(&self) -> FailureClass {
        match self.status_code() {
            Some(StatusCode::Unavailable) | Some(StatusCode::DeadlineExceeded) => FailureClass {
                transient: true,
                transport_broken: true,
            },
            Some(StatusCode::ResourceExhausted) | Some(StatusCode::Aborted) => FailureClass {
                transient: true,
                transport_broken: false,
            },
            _ => FailureClass {
                transient: false,
                transport_broken: false,
            },
        }
    }
}

/// A single failure record surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Status code, when the failure carried one.
    pub code: Option<StatusCode>,
    /// Human-readable message.
    pub message: String,
    /// Additional detail, if any.
    pub details: String,
}

impl ErrorDetail {
    /// Build a detail record from a transport failure.
    #[must_use]
    pub fn from_transport(err: &TransportError) -> Self {
        match err {
            TransportError::Status { code, message } => Self {
                code: Some(*code),
                message: message.clone(),
                details: format!("rpc error: code = {} desc = {}", code.name(), message),
            },
            other => Self {
                code: None,
                message: other.to_string(),
                details: String::new(),
            },
        }
    }
}

/// The family an operation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inputs failed validation before any network activity.
    Validation,
    /// The client is closed or was never connected.
    NotConnected,
    /// Establishing the lazy connection failed.
    Connect,
    /// A remote call failed (transient after exhaustion, or permanent).
    Remote,
    /// Reconnection after a broken transport failed.
    Reconnect,
    /// The caller's scope was cancelled or its deadline expired.
    Cancelled(CancelCause),
}

/// Structured error returned by every operation.
///
/// Carries the failure records, the number of retries consumed and whether
/// the final failure was transient. The caller-visible message never
/// contains internal diagnostic detail; use [`GnmiError::detailed`] in
/// trusted logging contexts.
#[derive(Debug)]
pub struct GnmiError {
    /// Name of the operation that failed.
    pub operation: &'static str,
    /// Error family.
    pub kind: ErrorKind,
    /// Caller-visible message.
    pub message: String,
    /// Failure records accumulated for this operation.
    pub errors: Vec<ErrorDetail>,
    /// Number of retries performed before giving up.
    pub retries: u32,
    /// Whether the final failure was transient.
    pub transient: bool,
    internal: Option<String>,
}

impl GnmiError {
    fn new(operation: &'static str, kind: ErrorKind, message: String) -> Self {
        Self {
            operation,
            kind,
            message,
            errors: Vec::new(),
            retries: 0,
            transient: false,
            internal: None,
        }
    }

    /// Validation failure, raised before any network activity.
    #[must_use]
    pub fn validation(operation: &'static str, err: ValidationError) -> Self {
        let message = err.to_string();
        let mut e = Self::new(operation, ErrorKind::Validation, message.clone());
        e.errors.push(ErrorDetail {
            code: Some(StatusCode::InvalidArgument),
            message,
            details: String::new(),
        });
        e
    }

    /// The client is closed or has no usable session.
    #[must_use]
    pub fn not_connected(operation: &'static str) -> Self {
        let mut e = Self::new(
            operation,
            ErrorKind::NotConnected,
            "client not connected".to_string(),
        );
        e.errors.push(ErrorDetail {
            code: None,
            message: "client not connected".to_string(),
            details: String::new(),
        });
        e
    }

    /// Lazy connection establishment failed.
    #[must_use]
    pub fn connect_failed(operation: &'static str, err: &TransportError) -> Self {
        let mut e = Self::new(
            operation,
            ErrorKind::Connect,
            format!("connection failed: {err}"),
        );
        e.errors.push(ErrorDetail::from_transport(err));
        e
    }

    /// Remote failure, either permanent or transient after exhaustion.
    #[must_use]
    pub fn remote(operation: &'static str, err: &TransportError, retries: u32) -> Self {
        let class = err.classify();
        let mut e = Self::new(operation, ErrorKind::Remote, format!("request failed: {err}"));
        e.errors.push(ErrorDetail::from_transport(err));
        e.retries = retries;
        e.transient = class.transient;
        e
    }

    /// Reconnection failed; wraps the transient failure that triggered it
    /// so callers can see both causes.
    #[must_use]
    pub fn reconnect_failed(
        operation: &'static str,
        cause: &TransportError,
        failure: &TransportError,
    ) -> Self {
        let mut e = Self::new(
            operation,
            ErrorKind::Reconnect,
            format!("operation failed and reconnection failed: {failure}"),
        );
        e.errors.push(ErrorDetail::from_transport(cause));
        e.errors.push(ErrorDetail::from_transport(failure));
        e.internal = Some(format!("reconnect triggered by: {cause}"));
        e
    }

    /// The caller's scope was cancelled or expired.
    #[must_use]
    pub fn cancelled(operation: &'static str, cause: CancelCause) -> Self {
        let mut e = Self::new(
            operation,
            ErrorKind::Cancelled(cause),
            format!("context cancelled: {cause}"),
        );
        e.errors.push(ErrorDetail {
            code: None,
            message: format!("context cancelled: {cause}"),
            details: String::new(),
        });
        e
    }

    /// Cancellation observed while sleeping between attempts.
    #[must_use]
    pub fn cancelled_during_backoff(operation: &'static str, cause: CancelCause) -> Self {
        let mut e = Self::new(
            operation,
            ErrorKind::Cancelled(cause),
            format!("context cancelled during backoff: {cause}"),
        );
        e.errors.push(ErrorDetail {
            code: None,
            message: format!("context cancelled during backoff: {cause}"),
            details: String::new(),
        });
        e
    }

    /// Attach internal diagnostic detail. Never shown in the caller-visible
    /// message; surfaced only via [`GnmiError::detailed`].
    #[must_use]
    pub fn with_internal(mut self, detail: impl Into<String>) -> Self {
        self.internal = Some(detail.into());
        self
    }

    /// Whether the final failure was transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// Whether this error reports a cancelled caller scope.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled(_))
    }

    /// Full message including internal diagnostic detail.
    ///
    /// Only for trusted logging contexts; the detail may contain
    /// filesystem paths and other information hidden from callers.
    #[must_use]
    pub fn detailed(&self) -> String {
        match &self.internal {
            None => self.to_string(),
            Some(detail) if self.retries > 0 => format!(
                "gnmi: {} failed: {} (internal: {}, retries: {})",
                self.operation, self.message, detail, self.retries
            ),
            Some(detail) => {
                format!("gnmi: {} failed: {} (internal: {})", self.operation, self.message, detail)
            }
        }
    }
}

impl fmt::Display for GnmiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.retries > 0 {
            write!(
                f,
                "gnmi: {} failed: {} (retries: {})",
                self.operation, self.message, self.retries
            )
        } else {
            write!(f, "gnmi: {} failed: {}", self.operation, self.message)
        }
    }
}

impl std::error::Error for GnmiError {}

/// Result alias for client operations.
pub type GnmiResult<T> = Result<T, GnmiError>;

/// Configuration errors, surfaced synchronously from the constructor.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The target address is empty.
    #[error("target address cannot be empty")]
    EmptyTarget,

    /// The port is outside the valid range.
    #[error("invalid port: {0} (must be 1-65535)")]
    InvalidPort(u32),

    /// A timeout is zero.
    #[error("{which} timeout must be positive")]
    NonPositiveTimeout {
        /// Which timeout was invalid.
        which: &'static str,
    },

    /// The backoff minimum delay is zero.
    #[error("backoff min delay must be positive")]
    NonPositiveBackoffMin,

    /// The backoff bounds are inverted.
    #[error("backoff max delay ({max:?}) must be greater than min delay ({min:?})")]
    InvertedBackoffBounds {
        /// Configured minimum delay.
        min: std::time::Duration,
        /// Configured maximum delay.
        max: std::time::Duration,
    },

    /// The backoff growth factor is below 1.0.
    #[error("backoff delay factor must be >= 1.0, got: {0}")]
    BackoffFactorTooSmall(f64),

    /// A TLS file is missing. Carries the base file name only, so the
    /// filesystem layout never leaks into caller-visible messages.
    #[error("TLS {kind} file not found: {file}")]
    TlsFileMissing {
        /// Which TLS file was missing (certificate, key, CA).
        kind: &'static str,
        /// Base name of the missing file.
        file: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::Unavailable, true, true)]
    #[case(StatusCode::DeadlineExceeded, true, true)]
    #[case(StatusCode::ResourceExhausted, true, false)]
    #[case(StatusCode::Aborted, true, false)]
    #[case(StatusCode::Internal, false, false)]
    #[case(StatusCode::InvalidArgument, false, false)]
    #[case(StatusCode::NotFound, false, false)]
    #[case(StatusCode::PermissionDenied, false, false)]
    #[case(StatusCode::Unknown, false, false)]
    fn test_classify_status(
        #[case] code: StatusCode,
        #[case] transient: bool,
        #[case] broken: bool,
    ) {
        let err = TransportError::status(code, "boom");
        let class = err.classify();
        assert_eq!(class.transient, transient);
        assert_eq!(class.transport_broken, broken);
    }

    #[test]
    fn test_classify_local_errors_permanent() {
        let err = TransportError::connect("dial tcp: refused");
        assert_eq!(
            err.classify(),
            FailureClass {
                transient: false,
                transport_broken: false
            }
        );

        let err = TransportError::from(anyhow::anyhow!("local failure"));
        assert!(!err.classify().transient);
        assert!(!err.classify().transport_broken);
    }

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::Unavailable.code(), 14);
        assert_eq!(StatusCode::DeadlineExceeded.code(), 4);
        assert_eq!(StatusCode::ResourceExhausted.code(), 8);
        assert_eq!(StatusCode::Aborted.code(), 10);
        assert_eq!(StatusCode::Internal.code(), 13);
    }

    #[test]
    fn test_error_detail_from_status() {
        let err = TransportError::status(StatusCode::Unavailable, "connection refused");
        let detail = ErrorDetail::from_transport(&err);
        assert_eq!(detail.code, Some(StatusCode::Unavailable));
        assert_eq!(detail.message, "connection refused");
        assert!(detail.details.contains("unavailable"));
    }

    #[test]
    fn test_gnmi_error_display_with_retries() {
        let err = TransportError::status(StatusCode::Unavailable, "down");
        let e = GnmiError::remote("get", &err, 3);
        assert_eq!(e.to_string(), "gnmi: get failed: request failed: unavailable: down (retries: 3)");
        assert!(e.is_transient());
    }

    #[test]
    fn test_gnmi_error_display_without_retries() {
        let err = TransportError::status(StatusCode::InvalidArgument, "bad path");
        let e = GnmiError::remote("set", &err, 0);
        assert_eq!(e.to_string(), "gnmi: set failed: request failed: invalid argument: bad path");
        assert!(!e.is_transient());
        assert_eq!(e.retries, 0);
    }

    #[test]
    fn test_detailed_keeps_internal_out_of_display() {
        let err = TransportError::status(StatusCode::Unavailable, "down");
        let e = GnmiError::remote("get", &err, 1).with_internal("/etc/tls/device.pem unreadable");
        assert!(!e.to_string().contains("/etc/tls"));
        assert!(e.detailed().contains("/etc/tls/device.pem"));
        assert!(e.detailed().contains("retries: 1"));
    }

    #[test]
    fn test_reconnect_error_wraps_both_causes() {
        let cause = TransportError::status(StatusCode::Unavailable, "channel down");
        let failure = TransportError::connect("dial tcp 10.0.0.1:57400: refused");
        let e = GnmiError::reconnect_failed("get", &cause, &failure);
        assert_eq!(e.errors.len(), 2);
        assert_eq!(e.errors[0].code, Some(StatusCode::Unavailable));
        assert_eq!(e.errors[1].code, None);
        assert!(e.message.contains("reconnection failed"));
    }

    #[test]
    fn test_cancelled_error_kind() {
        let e = GnmiError::cancelled("get", CancelCause::Cancelled);
        assert!(e.is_cancelled());
        assert!(!e.is_transient());
        let e = GnmiError::cancelled_during_backoff("set", CancelCause::DeadlineExceeded);
        assert!(matches!(e.kind, ErrorKind::Cancelled(CancelCause::DeadlineExceeded)));
        assert!(e.message.contains("during backoff"));
    }

    #[test]
    fn test_attempt_deadline_is_deadline_exceeded() {
        let err = TransportError::attempt_deadline(std::time::Duration::from_secs(5));
        assert_eq!(err.status_code(), Some(StatusCode::DeadlineExceeded));
        assert!(err.classify().transient);
        assert!(err.classify().transport_broken);
    }
}
