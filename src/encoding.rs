//! Value encodings for gNMI operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Data encoding for request and response values.
///
/// The set is closed; unknown encodings are rejected when parsing, so an
/// invalid encoding can never reach the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Standard JSON encoding.
    Json,
    /// JSON with IETF conventions. The default and recommended encoding.
    #[default]
    JsonIetf,
    /// Protocol Buffer encoding.
    Proto,
    /// ASCII encoding.
    Ascii,
    /// Raw byte encoding.
    Bytes,
}

impl Encoding {
    /// Wire name of the encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonIetf => "json_ietf",
            Self::Proto => "proto",
            Self::Ascii => "ascii",
            Self::Bytes => "bytes",
        }
    }

    /// Whether values in this encoding are JSON documents.
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json | Self::JsonIetf)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown encoding name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid encoding: {0} (valid values: json, json_ietf, proto, ascii, bytes)")]
pub struct ParseEncodingError(pub String);

impl FromStr for Encoding {
    type Err = ParseEncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "json_ietf" => Ok(Self::JsonIetf),
            "proto" => Ok(Self::Proto),
            "ascii" => Ok(Self::Ascii),
            "bytes" => Ok(Self::Bytes),
            other => Err(ParseEncodingError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("json", Encoding::Json)]
    #[case("json_ietf", Encoding::JsonIetf)]
    #[case("proto", Encoding::Proto)]
    #[case("ascii", Encoding::Ascii)]
    #[case("bytes", Encoding::Bytes)]
    fn test_parse_roundtrip(#[case] name: &str, #[case] encoding: Encoding) {
        assert_eq!(name.parse::<Encoding>().unwrap(), encoding);
        assert_eq!(encoding.as_str(), name);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "xml".parse::<Encoding>().unwrap_err();
        assert!(err.to_string().contains("invalid encoding: xml"));
    }

    #[test]
    fn test_default_is_json_ietf() {
        assert_eq!(Encoding::default(), Encoding::JsonIetf);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Encoding::JsonIetf).unwrap();
        assert_eq!(json, "\"json_ietf\"");
    }
}
