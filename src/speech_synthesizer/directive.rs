//! Inbound `Speak` directive parsing (§4.1, §7).
//!
//! The wire payload is a small JSON object; this module is the only place
//! that looks at raw JSON before it becomes a typed [`SpeakDirective`] or a
//! rejection reason. Validation failures never panic the executor — they
//! become an [`ExceptionCode::UnexpectedInformationReceived`] reported
//! upstream before a [`super::record::DirectiveRecord`] is ever created.

use serde::Deserialize;

use crate::error::{DirectiveFailure, ExceptionCode};

use super::record::{MessageId, SpeakToken};

/// Raw wire shape of a `Speak` directive payload.
#[derive(Debug, Deserialize)]
struct RawSpeakPayload {
    token: Option<String>,
    url: Option<String>,
}

/// A validated `Speak` directive, ready to become a [`super::record::DirectiveRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakDirective {
    pub message_id: MessageId,
    pub token: SpeakToken,
    /// Attachment identifier extracted from the `cid:` URL scheme (the only
    /// scheme this agent accepts; anything else is a malformed directive).
    pub attachment_id: String,
}

impl SpeakDirective {
    /// Parse and validate a directive envelope: `messageId` from the
    /// directive header, `payload` as the raw JSON body.
    ///
    /// Returns a [`DirectiveFailure`] describing why the payload was
    /// rejected, never a panic — a malformed directive from the cloud is
    /// an expected, not exceptional, event (§7).
    pub fn parse(message_id: impl Into<String>, payload: &str) -> Result<Self, DirectiveFailure> {
        let raw: RawSpeakPayload = serde_json::from_str(payload).map_err(|e| {
            DirectiveFailure::new(
                ExceptionCode::UnexpectedInformationReceived,
                format!("malformed Speak payload: {e}"),
            )
        })?;

        let token = raw.token.ok_or_else(|| {
            DirectiveFailure::new(
                ExceptionCode::UnexpectedInformationReceived,
                "missing required field: token",
            )
        })?;

        let url = raw.url.ok_or_else(|| {
            DirectiveFailure::new(
                ExceptionCode::UnexpectedInformationReceived,
                "missing required field: url",
            )
        })?;

        let attachment_id = url.strip_prefix("cid:").ok_or_else(|| {
            DirectiveFailure::new(
                ExceptionCode::UnexpectedInformationReceived,
                format!("unsupported url scheme: {url}"),
            )
        })?;

        Ok(Self {
            message_id: MessageId::new(message_id),
            token: SpeakToken::new(token),
            attachment_id: attachment_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_payload() {
        let directive =
            SpeakDirective::parse("msg-1", r#"{"token":"tok-1","url":"cid:attach-1"}"#).unwrap();
        assert_eq!(directive.message_id, MessageId::new("msg-1"));
        assert_eq!(directive.token, SpeakToken::new("tok-1"));
        assert_eq!(directive.attachment_id, "attach-1");
    }

    #[test]
    fn rejects_missing_token() {
        let err = SpeakDirective::parse("msg-1", r#"{"url":"cid:attach-1"}"#).unwrap_err();
        assert_eq!(err.code, ExceptionCode::UnexpectedInformationReceived);
        assert!(err.description.contains("token"));
    }

    #[test]
    fn rejects_missing_url() {
        let err = SpeakDirective::parse("msg-1", r#"{"token":"tok-1"}"#).unwrap_err();
        assert_eq!(err.code, ExceptionCode::UnexpectedInformationReceived);
        assert!(err.description.contains("url"));
    }

    #[test]
    fn rejects_unsupported_url_scheme() {
        let err =
            SpeakDirective::parse("msg-1", r#"{"token":"tok-1","url":"https://example.com"}"#)
                .unwrap_err();
        assert_eq!(err.code, ExceptionCode::UnexpectedInformationReceived);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = SpeakDirective::parse("msg-1", "not json").unwrap_err();
        assert_eq!(err.code, ExceptionCode::UnexpectedInformationReceived);
    }
}
