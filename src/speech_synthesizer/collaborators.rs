//! Contracts for the four external collaborators named in §6.
//!
//! None of these are implemented by this crate — the media player, focus
//! manager, attachment store, and upstream sequencer are all out of scope
//! (§1). These traits exist so the agent is generic over them, and so
//! tests can substitute fakes, following the teacher's dependency-injection
//! idiom (`enrichment/traits.rs`: a trait per external API, a mock module
//! behind `#[cfg(test)]`).

use crate::error::ExceptionCode;

/// A lazy, restartable byte source for one directive's audio attachment.
pub trait AttachmentReader: Send {
    /// Read up to `buf.len()` bytes. An `Ok(0)` return signals end of stream.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Resolves an opaque attachment identifier to a readable stream.
pub trait AttachmentStore: Send + Sync {
    fn open(&self, attachment_id: &str) -> Result<Box<dyn AttachmentReader>, String>;
}

/// The media player the agent hands attachment readers to.
///
/// `set_source`/`play` are synchronous attempts; asynchronous completion
/// arrives later via [`crate::speech_synthesizer::SpeechSynthesizer::on_media_started`]
/// / `on_media_finished` / `on_media_error`, called by the real player (or a
/// test harness) on whatever thread it likes — the callback never chooses
/// the synchronization, the agent's executor does.
pub trait MediaPlayer: Send + Sync {
    fn set_source(&self, reader: Box<dyn AttachmentReader>) -> Result<(), String>;
    fn play(&self) -> Result<(), String>;
    fn stop(&self);
    /// Current playback offset in milliseconds.
    fn offset_ms(&self) -> i64;
}

/// The focus arbiter for a named audio channel.
///
/// `request_foreground` is a synchronous accept/reject of the *request*;
/// the actual grant arrives later via
/// [`crate::speech_synthesizer::SpeechSynthesizer::on_focus_changed`].
pub trait FocusManager: Send + Sync {
    /// Returns `false` if the request is rejected synchronously
    /// (`CHANNEL_ACQUISITION_FAILED`).
    fn request_foreground(&self, channel: &str) -> bool;
    fn release(&self, channel: &str);
}

/// Per-directive completion handle reported to the upstream sequencer.
pub trait ResultCallback: Send {
    fn set_completed(&self);
    fn set_failed(&self, description: String);
}

/// Outbound event transport: `SpeechStarted`/`SpeechFinished`/exception reports.
///
/// Each method receives the already-built `{header, payload}` envelope
/// (§6) — construction lives in `events.rs`, not here, so every sink (real
/// or fake) sees the same wire shape rather than reassembling it itself.
pub trait EventSink: Send + Sync {
    fn emit_speech_started(&self, event: serde_json::Value);
    fn emit_speech_finished(&self, event: serde_json::Value);
    fn emit_exception(&self, event: serde_json::Value);
}

/// Publishes context snapshots to the aggregator.
pub trait ContextManager: Send + Sync {
    fn publish_context(&self, state: serde_json::Value);
}

/// Fakes for every collaborator trait above, in the teacher's
/// `enrichment::traits::mocks` style: deterministic, introspectable, and
/// cheap to share across threads via `Arc`/`Clone`. Used by the test suite
/// and by the demonstration binary, which has no real media player, focus
/// manager, attachment store, or cloud transport to talk to.
pub mod mocks {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory attachment store keyed by attachment id.
    #[derive(Clone, Default)]
    pub struct InMemoryAttachmentStore {
        attachments: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl InMemoryAttachmentStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, attachment_id: impl Into<String>, bytes: Vec<u8>) {
            self.attachments
                .lock()
                .unwrap()
                .insert(attachment_id.into(), bytes);
        }
    }

    impl AttachmentStore for InMemoryAttachmentStore {
        fn open(&self, attachment_id: &str) -> Result<Box<dyn AttachmentReader>, String> {
            let bytes = self
                .attachments
                .lock()
                .unwrap()
                .get(attachment_id)
                .cloned()
                .ok_or_else(|| format!("no such attachment: {attachment_id}"))?;
            Ok(Box::new(CursorReader(Cursor::new(bytes))))
        }
    }

    pub struct CursorReader(Cursor<Vec<u8>>);

    impl AttachmentReader for CursorReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            std::io::Read::read(&mut self.0, buf)
        }
    }

    /// Scripted media player: every call is recorded, and start/play
    /// behavior is configurable to exercise the failure paths of §7.
    #[derive(Clone)]
    pub struct ScriptedMediaPlayer {
        inner: Arc<Mutex<ScriptedMediaPlayerState>>,
    }

    #[derive(Default)]
    struct ScriptedMediaPlayerState {
        offset_ms: i64,
        fail_set_source: Option<String>,
        fail_play: Option<String>,
        play_calls: u32,
        stop_calls: u32,
    }

    impl Default for ScriptedMediaPlayer {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(ScriptedMediaPlayerState::default())),
            }
        }
    }

    impl ScriptedMediaPlayer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_next_set_source(&self, message: impl Into<String>) {
            self.inner.lock().unwrap().fail_set_source = Some(message.into());
        }

        pub fn fail_next_play(&self, message: impl Into<String>) {
            self.inner.lock().unwrap().fail_play = Some(message.into());
        }

        pub fn set_offset_ms(&self, offset_ms: i64) {
            self.inner.lock().unwrap().offset_ms = offset_ms;
        }

        pub fn play_calls(&self) -> u32 {
            self.inner.lock().unwrap().play_calls
        }

        pub fn stop_calls(&self) -> u32 {
            self.inner.lock().unwrap().stop_calls
        }
    }

    impl MediaPlayer for ScriptedMediaPlayer {
        fn set_source(&self, _reader: Box<dyn AttachmentReader>) -> Result<(), String> {
            let mut state = self.inner.lock().unwrap();
            if let Some(message) = state.fail_set_source.take() {
                return Err(message);
            }
            Ok(())
        }

        fn play(&self) -> Result<(), String> {
            let mut state = self.inner.lock().unwrap();
            state.play_calls += 1;
            if let Some(message) = state.fail_play.take() {
                return Err(message);
            }
            Ok(())
        }

        fn stop(&self) {
            self.inner.lock().unwrap().stop_calls += 1;
        }

        fn offset_ms(&self) -> i64 {
            self.inner.lock().unwrap().offset_ms
        }
    }

    /// Focus manager whose synchronous accept/reject is scripted; the
    /// async grant is driven explicitly by the test via
    /// `SpeechSynthesizer::on_focus_changed`.
    #[derive(Clone)]
    pub struct ScriptedFocusManager {
        inner: Arc<Mutex<ScriptedFocusState>>,
    }

    #[derive(Default)]
    struct ScriptedFocusState {
        reject_next_request: bool,
        requests: Vec<String>,
        releases: Vec<String>,
    }

    impl Default for ScriptedFocusManager {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(ScriptedFocusState::default())),
            }
        }
    }

    impl ScriptedFocusManager {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reject_next_request(&self) {
            self.inner.lock().unwrap().reject_next_request = true;
        }

        pub fn request_count(&self) -> usize {
            self.inner.lock().unwrap().requests.len()
        }

        pub fn release_count(&self) -> usize {
            self.inner.lock().unwrap().releases.len()
        }
    }

    impl FocusManager for ScriptedFocusManager {
        fn request_foreground(&self, channel: &str) -> bool {
            let mut state = self.inner.lock().unwrap();
            state.requests.push(channel.to_string());
            if state.reject_next_request {
                state.reject_next_request = false;
                return false;
            }
            true
        }

        fn release(&self, channel: &str) {
            self.inner.lock().unwrap().releases.push(channel.to_string());
        }
    }

    /// Records completion/failure reports for assertions.
    #[derive(Clone, Default)]
    pub struct RecordingResultCallback {
        inner: Arc<Mutex<RecordingResultCallbackState>>,
    }

    #[derive(Default)]
    struct RecordingResultCallbackState {
        completed: u32,
        failed: Vec<String>,
    }

    impl RecordingResultCallback {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn completed_count(&self) -> u32 {
            self.inner.lock().unwrap().completed
        }

        pub fn failed_count(&self) -> usize {
            self.inner.lock().unwrap().failed.len()
        }

        pub fn failure_descriptions(&self) -> Vec<String> {
            self.inner.lock().unwrap().failed.clone()
        }
    }

    impl ResultCallback for RecordingResultCallback {
        fn set_completed(&self) {
            self.inner.lock().unwrap().completed += 1;
        }

        fn set_failed(&self, description: String) {
            self.inner.lock().unwrap().failed.push(description);
        }
    }

    /// Records every emitted event/exception in arrival order, for
    /// asserting P1 (`SpeechStarted` precedes `SpeechFinished`) and the
    /// literal scenarios of §8.
    #[derive(Clone, Default)]
    pub struct RecordingEventSink {
        events: Arc<Mutex<Vec<RecordedEvent>>>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RecordedEvent {
        Started(String),
        Finished(String),
        Exception(ExceptionCode, String),
    }

    impl RecordingEventSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<RecordedEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingEventSink {
        fn emit_speech_started(&self, event: serde_json::Value) {
            let token = event["payload"]["token"].as_str().unwrap_or_default().to_string();
            self.events.lock().unwrap().push(RecordedEvent::Started(token));
        }

        fn emit_speech_finished(&self, event: serde_json::Value) {
            let token = event["payload"]["token"].as_str().unwrap_or_default().to_string();
            self.events.lock().unwrap().push(RecordedEvent::Finished(token));
        }

        fn emit_exception(&self, event: serde_json::Value) {
            let code = event["payload"]["code"].as_str().unwrap_or_default();
            let code = ExceptionCode::from_wire(code)
                .unwrap_or_else(|| panic!("unrecognized exception code on wire: {code}"));
            let description = event["payload"]["description"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            self.events
                .lock()
                .unwrap()
                .push(RecordedEvent::Exception(code, description));
        }
    }

    /// Records every published context snapshot.
    #[derive(Clone, Default)]
    pub struct RecordingContextManager {
        snapshots: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    impl RecordingContextManager {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn snapshots(&self) -> Vec<serde_json::Value> {
            self.snapshots.lock().unwrap().clone()
        }
    }

    impl ContextManager for RecordingContextManager {
        fn publish_context(&self, state: serde_json::Value) {
            self.snapshots.lock().unwrap().push(state);
        }
    }
}
