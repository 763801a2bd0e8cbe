//! Structured errors reported by dispatchers.

use std::fmt;

use thiserror::Error;

/// Machine-distinguishable category of a dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    /// No method with the requested name exists.
    UnknownMethod,
    /// The method rejected its arguments.
    InvalidArguments,
    /// The method ran and failed.
    Failed,
    /// The operation is not supported by this dispatcher.
    Unsupported,
}

impl DispatchErrorKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownMethod => "unknown method",
            Self::InvalidArguments => "invalid arguments",
            Self::Failed => "method failed",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for DispatchErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A failed method invocation: a kind plus a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct DispatchError {
    kind: DispatchErrorKind,
    detail: String,
}

impl DispatchError {
    /// Creates an error of the given kind.
    pub fn new(kind: DispatchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Creates an unknown method error.
    pub fn unknown_method(method: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::UnknownMethod, method)
    }

    /// Creates an invalid arguments error.
    pub fn invalid_arguments(detail: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::InvalidArguments, detail)
    }

    /// Creates a method failure error.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Failed, detail)
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Unsupported, detail)
    }

    /// Category of the failure.
    #[must_use]
    pub const fn kind(&self) -> DispatchErrorKind {
        self.kind
    }

    /// Human-readable detail message.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}
