//! Directive record and identifiers.

use std::fmt;

use super::collaborators::ResultCallback;

/// Primary key of a `Speak` directive, taken from the envelope's `messageId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Opaque token echoed in `SpeechStarted`/`SpeechFinished` events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpeakToken(String);

impl SpeakToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeakToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One `Speak` utterance, from pre-handle until retirement.
///
/// Lifecycle: created by `pre_handle`; becomes the current speaker when
/// focus is granted; destroyed after playback terminates (finished,
/// cancelled, or errored) and both owed notifications (`send_finished`,
/// `send_completed`) have been delivered (I3).
pub struct DirectiveRecord {
    pub message_id: MessageId,
    pub token: SpeakToken,
    /// Opaque identifier resolved lazily via the attachment store; the
    /// reader itself is only opened when this record becomes current.
    pub attachment_id: String,
    /// Handle used to report completion/failure upstream. `None` for
    /// directives that only need cloud-side notification.
    pub result_callback: Option<Box<dyn ResultCallback>>,
    /// Whether a `SpeechFinished` event is still owed to the cloud.
    pub send_finished: bool,
    /// Whether a completion report is still owed to the upstream sequencer.
    pub send_completed: bool,
    /// Whether `SpeechStarted` has already fired for this record. Gates
    /// `SpeechFinished`: a directive cancelled before it ever reached
    /// `Playing` never gets a matching finished event (P1).
    pub started: bool,
}

impl DirectiveRecord {
    pub fn new(
        message_id: MessageId,
        token: SpeakToken,
        attachment_id: impl Into<String>,
        result_callback: Option<Box<dyn ResultCallback>>,
    ) -> Self {
        Self {
            message_id,
            token,
            attachment_id: attachment_id.into(),
            result_callback,
            send_finished: true,
            send_completed: true,
            started: false,
        }
    }

    /// Mark that `SpeechStarted` has fired.
    pub fn mark_started(&mut self) {
        self.started = true;
    }

    /// Report completion upstream exactly once, per I3.
    pub fn report_completed(&mut self) {
        if self.send_completed {
            self.send_completed = false;
            if let Some(cb) = &self.result_callback {
                cb.set_completed();
            }
        }
    }

    /// Report failure upstream exactly once, per I3.
    pub fn report_failed(&mut self, description: impl Into<String>) {
        if self.send_completed {
            self.send_completed = false;
            if let Some(cb) = &self.result_callback {
                cb.set_failed(description.into());
            }
        }
    }

    /// Consume the owed `SpeechFinished` flag; returns whether it was owed.
    pub fn take_send_finished(&mut self) -> bool {
        std::mem::replace(&mut self.send_finished, false)
    }

    /// Consume the owed completion-report flag without reporting anything,
    /// for cancel retirement (§4.7): the flag is cleared exactly once (I3)
    /// but no callback is ever invoked for it.
    pub fn take_send_completed(&mut self) -> bool {
        std::mem::replace(&mut self.send_completed, false)
    }
}

impl fmt::Debug for DirectiveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveRecord")
            .field("message_id", &self.message_id)
            .field("token", &self.token)
            .field("attachment_id", &self.attachment_id)
            .field("send_finished", &self.send_finished)
            .field("send_completed", &self.send_completed)
            .field("started", &self.started)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech_synthesizer::collaborators::mocks::RecordingResultCallback;

    #[test]
    fn report_completed_is_idempotent() {
        let cb = RecordingResultCallback::new();
        let mut record = DirectiveRecord::new(
            MessageId::new("A"),
            SpeakToken::new("tok-A"),
            "attachment-A",
            Some(Box::new(cb.clone())),
        );

        record.report_completed();
        record.report_completed(); // should be a no-op the second time

        assert_eq!(cb.completed_count(), 1);
        assert!(!record.send_completed);
    }

    #[test]
    fn report_failed_does_not_fire_if_already_completed() {
        let cb = RecordingResultCallback::new();
        let mut record = DirectiveRecord::new(
            MessageId::new("A"),
            SpeakToken::new("tok-A"),
            "attachment-A",
            Some(Box::new(cb.clone())),
        );

        record.report_completed();
        record.report_failed("should not fire");

        assert_eq!(cb.completed_count(), 1);
        assert_eq!(cb.failed_count(), 0);
    }

    #[test]
    fn take_send_finished_clears_flag_once() {
        let mut record = DirectiveRecord::new(
            MessageId::new("A"),
            SpeakToken::new("tok-A"),
            "attachment-A",
            None,
        );
        assert!(record.take_send_finished());
        assert!(!record.take_send_finished());
    }

    #[test]
    fn cancelling_current_clears_both_flags_without_reporting() {
        let cb = RecordingResultCallback::new();
        let mut record = DirectiveRecord::new(
            MessageId::new("A"),
            SpeakToken::new("tok-A"),
            "attachment-A",
            Some(Box::new(cb.clone())),
        );

        assert!(record.take_send_finished());
        assert!(record.take_send_completed());
        // Second call to either is a no-op, matching I3's "exactly once".
        assert!(!record.take_send_finished());
        assert!(!record.take_send_completed());

        assert_eq!(cb.completed_count(), 0);
        assert_eq!(cb.failed_count(), 0);
    }
}
