//! Crate-wide error types.
//!
//! This module provides the error hierarchy for the agent. Internal
//! components use a specific [`SynthesizerError`] via `thiserror`; the
//! demonstration binary uses `anyhow` for convenient propagation out of
//! `main`.
//!
//! # Design
//!
//! - [`SynthesizerError`]: top-level error enum for fallible public entry
//!   points (e.g. rejecting a malformed directive before it is ever
//!   enqueued, or saving configuration).
//! - [`ExceptionCode`]: the exception taxonomy of §7 — the reason a
//!   *directive* failed, reported upstream via `ResultCallback::set_failed`
//!   rather than returned from a Rust function (directive failures never
//!   unwind the executor).

use std::fmt;

/// Agent-wide result type.
pub type Result<T> = std::result::Result<T, SynthesizerError>;

/// Top-level agent error, for failures detected before a directive is
/// accepted into the store (malformed payloads) or in agent-lifecycle
/// operations that can themselves fail.
#[derive(Debug, thiserror::Error)]
pub enum SynthesizerError {
    /// The inbound `Speak` directive was missing a required field.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// The attachment referenced by a directive could not be opened.
    #[error("attachment error: {0}")]
    Attachment(String),

    /// The executor's task channel is gone (the executor thread has
    /// stopped); callers should treat the agent as shut down.
    #[error("executor is shut down")]
    ExecutorClosed,

    /// Generic error with added context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SynthesizerError>,
    },
}

impl SynthesizerError {
    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to `Result`s.
pub trait ResultExt<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

/// The exception taxonomy of §7: the reason a single directive failed.
///
/// Unlike [`SynthesizerError`], this is never returned from a Rust
/// function — it is the payload carried upstream via
/// [`crate::collaborators::ResultCallback::set_failed`] and, where the
/// cloud voice service is the authority (not the upstream sequencer), also
/// emitted as an exception event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExceptionCode {
    /// A required field (e.g. `token`) was missing from the directive payload.
    UnexpectedInformationReceived,
    /// The attachment could not be read, or the media player failed to start.
    InternalError,
    /// Foreground focus could not be requested or was rejected.
    ChannelAcquisitionFailed,
}

impl ExceptionCode {
    /// The wire name used in exception reports, matching the cloud voice
    /// service's error-code vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedInformationReceived => "UNEXPECTED_INFORMATION_RECEIVED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ChannelAcquisitionFailed => "CHANNEL_ACQUISITION_FAILED",
        }
    }

    /// Parse a wire code back into its variant, the inverse of [`Self::as_str`].
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "UNEXPECTED_INFORMATION_RECEIVED" => Some(Self::UnexpectedInformationReceived),
            "INTERNAL_ERROR" => Some(Self::InternalError),
            "CHANNEL_ACQUISITION_FAILED" => Some(Self::ChannelAcquisitionFailed),
            _ => None,
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directive-level failure: an [`ExceptionCode`] plus free-form detail
/// text (e.g. the media player's decode error message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveFailure {
    pub code: ExceptionCode,
    pub description: String,
}

impl DirectiveFailure {
    pub fn new(code: ExceptionCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

impl fmt::Display for DirectiveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SynthesizerError::MissingField("token".to_string());
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn error_with_context() {
        let err = SynthesizerError::Attachment("read failed".to_string())
            .context("while opening attachment for A");
        let msg = err.to_string();
        assert!(msg.contains("while opening attachment for A"));
    }

    #[test]
    fn exception_code_wire_names() {
        assert_eq!(
            ExceptionCode::UnexpectedInformationReceived.as_str(),
            "UNEXPECTED_INFORMATION_RECEIVED"
        );
        assert_eq!(ExceptionCode::InternalError.as_str(), "INTERNAL_ERROR");
        assert_eq!(
            ExceptionCode::ChannelAcquisitionFailed.as_str(),
            "CHANNEL_ACQUISITION_FAILED"
        );
    }

    #[test]
    fn exception_code_wire_round_trips() {
        for code in [
            ExceptionCode::UnexpectedInformationReceived,
            ExceptionCode::InternalError,
            ExceptionCode::ChannelAcquisitionFailed,
        ] {
            assert_eq!(ExceptionCode::from_wire(code.as_str()), Some(code));
        }
        assert_eq!(ExceptionCode::from_wire("NOT_A_REAL_CODE"), None);
    }

    #[test]
    fn directive_failure_display() {
        let failure = DirectiveFailure::new(ExceptionCode::InternalError, "decode error");
        assert_eq!(failure.to_string(), "INTERNAL_ERROR: decode error");
    }
}
