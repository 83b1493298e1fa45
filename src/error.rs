//! Error types for the share-link codec.
//!
//! [`LinkError`] is what a user-supplied link can produce. [`InvariantViolation`]
//! is what a malformed in-memory model produces when it is serialized.

use thiserror::Error;

use crate::model::ProtocolKind;

/// Failure to turn a share link into a canonical outbound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The scheme is not one of the supported protocols.
    #[error("Unsupported protocol: {0:?}")]
    UnsupportedProtocol(String),

    /// The link body does not follow the protocol's grammar.
    #[error("Malformed link: {0}")]
    MalformedLink(String),

    /// Base64, percent-encoding or UTF-8 decoding failed.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A field the protocol cannot work without is absent or empty.
    #[error("{protocol} link is missing required field '{field}'")]
    MissingField {
        protocol: ProtocolKind,
        field: &'static str,
    },

    /// A numeric field is out of range and has no default to fall back on.
    #[error("Invalid number for '{field}': {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

impl LinkError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        LinkError::MalformedLink(reason.into())
    }

    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        LinkError::InvalidEncoding(reason.into())
    }

    pub(crate) fn missing(protocol: ProtocolKind, field: &'static str) -> Self {
        LinkError::MissingField { protocol, field }
    }
}

/// A canonical outbound that breaks its own structural invariants.
///
/// Only produced by serializers and [`crate::model::CanonicalOutbound::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Outbound invariant violated: {0}")]
pub struct InvariantViolation(pub String);

/// Codec result type
pub type Result<T, E = LinkError> = std::result::Result<T, E>;
