//! Focus/playback coordinator: the public [`SpeechSynthesizer`] API (§4.3–§4.7).
//!
//! All mutation funnels through the serial executor (§5); public methods
//! here only validate input and submit an [`ExecutorTask`], except
//! [`SpeechSynthesizer::provide_state`] which only reads. Locking order is
//! fixed crate-wide: `store` before `state`, and no collaborator is ever
//! called while either lock is held — grounded on the teacher's
//! `player::audio::audio_thread_main`, which mutates `AudioSharedState`
//! under lock and only sends `PlayerEvent`s back out after releasing it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{info, warn};

use crate::error::{DirectiveFailure, ExceptionCode, Result};

use super::collaborators::{AttachmentStore, ContextManager, EventSink, FocusManager, MediaPlayer, ResultCallback};
use super::context;
use super::directive::SpeakDirective;
use super::events;
use super::executor::{Executor, ExecutorTask};
use super::observer::{ObserverRegistry, SpeechSynthesizerObserver};
use super::record::{DirectiveRecord, MessageId};
use super::state::{FocusState, PlaybackState, StateInner};
use super::store::DirectiveStore;

/// Everything the executor thread needs, shared with the handle that
/// fronts it. Only the executor thread mutates `store`/`state` — other
/// threads take the locks solely to read or to wait on `state_cv`.
struct Inner {
    store: Mutex<DirectiveStore>,
    state: Mutex<StateInner>,
    state_cv: Condvar,
    observers: ObserverRegistry,
    attachment_store: Box<dyn AttachmentStore>,
    media_player: Box<dyn MediaPlayer>,
    focus_manager: Box<dyn FocusManager>,
    event_sink: Box<dyn EventSink>,
    context_manager: Box<dyn ContextManager>,
    focus_channel: String,
}

/// Speech synthesizer capability agent: sequences `Speak` directives
/// against a shared audio-channel focus, a media player, and a context
/// publisher (§1).
pub struct SpeechSynthesizer {
    inner: Arc<Inner>,
    executor: Mutex<Executor>,
}

impl SpeechSynthesizer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        attachment_store: Box<dyn AttachmentStore>,
        media_player: Box<dyn MediaPlayer>,
        focus_manager: Box<dyn FocusManager>,
        event_sink: Box<dyn EventSink>,
        context_manager: Box<dyn ContextManager>,
        focus_channel: impl Into<String>,
        queue_capacity: usize,
        shutdown_drain_timeout: Duration,
    ) -> Self {
        let inner = Arc::new(Inner {
            store: Mutex::new(DirectiveStore::new()),
            state: Mutex::new(StateInner::default()),
            state_cv: Condvar::new(),
            observers: ObserverRegistry::new(),
            attachment_store,
            media_player,
            focus_manager,
            event_sink,
            context_manager,
            focus_channel: focus_channel.into(),
        });

        let executor_inner = inner.clone();
        let shutdown_inner = inner.clone();
        let executor = Executor::spawn(
            queue_capacity,
            shutdown_drain_timeout,
            move |task| executor_inner.handle_task(task),
            move || shutdown_inner.shutdown(),
        );

        Self {
            inner,
            executor: Mutex::new(executor),
        }
    }

    /// Pre-handle + handle a `Speak` directive (§4.1, §4.4). Parse failures
    /// are reported upstream immediately and never reach the executor,
    /// since no record was ever created for them.
    pub fn handle(
        &self,
        message_id: impl Into<String>,
        payload: &str,
        result_callback: Option<Box<dyn ResultCallback>>,
    ) -> Result<()> {
        let message_id = message_id.into();
        match SpeakDirective::parse(message_id.clone(), payload) {
            Ok(directive) => self
                .executor
                .lock()
                .submit(ExecutorTask::Handle(directive, result_callback)),
            Err(failure) => {
                self.report_parse_failure(&message_id, &failure, result_callback);
                Ok(())
            }
        }
    }

    fn report_parse_failure(
        &self,
        message_id: &str,
        failure: &DirectiveFailure,
        result_callback: Option<Box<dyn ResultCallback>>,
    ) {
        warn!(target: "speech_synthesizer::coordinator", message_id, %failure, "rejecting malformed Speak directive");
        self.inner
            .event_sink
            .emit_exception(events::exception_report(&failure.code, &failure.description));
        if let Some(cb) = result_callback {
            cb.set_failed(failure.description.clone());
        }
    }

    /// Cancel a directive by id, whether queued or currently playing (§4.7).
    pub fn cancel_directive(&self, message_id: impl Into<String>) -> Result<()> {
        self.executor
            .lock()
            .submit(ExecutorTask::Cancel(MessageId::new(message_id)))
    }

    /// Notify the agent of a focus grant/loss. Submits the transition to
    /// the executor, then blocks the caller until the internal state has
    /// actually reached its desired state (§5) — for a loss mid-play, that
    /// is only once the later `on_media_finished`/`on_media_error` task
    /// retires the directive, not once this transition's own task returns.
    pub fn on_focus_changed(&self, focus: FocusState) -> Result<()> {
        let observed_epoch = self.inner.state.lock().settle_epoch;

        self.executor
            .lock()
            .submit(ExecutorTask::OnFocusChanged(focus))?;

        let mut state = self.inner.state.lock();
        while state.settle_epoch == observed_epoch {
            self.inner.state_cv.wait(&mut state);
        }
        Ok(())
    }

    pub fn on_media_started(&self) -> Result<()> {
        self.executor.lock().submit(ExecutorTask::OnMediaStarted)
    }

    pub fn on_media_finished(&self) -> Result<()> {
        self.executor.lock().submit(ExecutorTask::OnMediaFinished)
    }

    pub fn on_media_error(&self, description: impl Into<String>) -> Result<()> {
        self.executor
            .lock()
            .submit(ExecutorTask::OnMediaError(description.into()))
    }

    pub fn add_observer(&self, observer: Arc<dyn SpeechSynthesizerObserver>) {
        self.inner.observers.add(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn SpeechSynthesizerObserver>) -> bool {
        self.inner.observers.remove(observer)
    }

    /// Read-only context snapshot (§4.8). Never goes through the executor:
    /// it doesn't mutate anything, so it can read a consistent snapshot
    /// directly under the state lock.
    pub fn provide_state(&self) -> serde_json::Value {
        let (token, playback) = {
            let state = self.inner.state.lock();
            (state.current_token.clone(), state.playback)
        };
        let offset_ms = self.inner.media_player.offset_ms();
        context::build(token.as_ref().map(|t| t.as_str()), offset_ms, playback)
    }

    /// Stop accepting new work and join the executor thread, draining
    /// whatever was already queued (§5).
    pub fn shutdown(&self) {
        self.executor.lock().shutdown();
    }
}

/// Why the current directive is being retired (§4.7, §4.8): governs whether
/// a completion/failure report and a `SpeechFinished` event are still owed.
enum Retirement {
    /// Playback reached its natural end.
    Completed,
    /// Playback failed; carries the exception code/description already
    /// emitted upstream as an event.
    Failed(DirectiveFailure),
    /// Explicitly cancelled (§4.7): neither `SpeechFinished` nor a
    /// completion/failure report is sent — the upstream is the authority on
    /// a directive it cancelled, not the cloud.
    Cancelled,
}

impl Inner {
    fn handle_task(&self, task: ExecutorTask) {
        match task {
            ExecutorTask::Handle(directive, result_callback) => {
                self.handle_directive(directive, result_callback)
            }
            ExecutorTask::Cancel(message_id) => self.cancel(message_id),
            ExecutorTask::OnFocusChanged(focus) => self.on_focus_changed(focus),
            ExecutorTask::OnMediaStarted => self.on_media_started(),
            ExecutorTask::OnMediaFinished => self.on_media_finished(),
            ExecutorTask::OnMediaError(description) => self.on_media_error(description),
            // The executor intercepts `Shutdown` itself and invokes
            // `Inner::shutdown` directly as its `on_shutdown` hook (wired in
            // `SpeechSynthesizer::new`) rather than forwarding it here.
            ExecutorTask::Shutdown => unreachable!("Shutdown is never forwarded to handle_task"),
        }
    }

    /// Tear down everything the agent still owes an answer to (§4.8, §7
    /// "Shutdown"): stop and release the current directive (if any) and
    /// drain the pending queue, reporting a shutdown failure upstream for
    /// every one of them. No `SpeechFinished` is emitted for any of
    /// them — shutdown is an abort, not a graceful finish.
    fn shutdown(&self) {
        const DESCRIPTION: &str = "agent is shutting down";

        let current_id = {
            let mut state = self.state.lock();
            let id = state.current.take();
            state.current_token = None;
            state.playback = PlaybackState::Finished;
            state.desired = PlaybackState::Finished;
            state.settle_epoch += 1;
            id
        };

        if current_id.is_some() {
            self.media_player.stop();
            self.focus_manager.release(&self.focus_channel);
        }

        let mut failed = {
            let mut store = self.store.lock();
            let mut failed = Vec::new();
            if let Some(id) = &current_id {
                if let Some(record) = store.remove(id) {
                    failed.push(record);
                }
            }
            for id in store.drain_queue() {
                if let Some(record) = store.remove(&id) {
                    failed.push(record);
                }
            }
            failed
        };

        for record in &mut failed {
            record.report_failed(DESCRIPTION);
        }

        self.wake_waiters();
    }

    fn handle_directive(
        &self,
        directive: SpeakDirective,
        result_callback: Option<Box<dyn ResultCallback>>,
    ) {
        let record = DirectiveRecord::new(
            directive.message_id.clone(),
            directive.token,
            directive.attachment_id,
            result_callback,
        );

        let (registered, should_activate) = {
            let mut store = self.store.lock();
            if !store.register(record) {
                warn!(target: "speech_synthesizer::coordinator", message_id = %directive.message_id, "dropping duplicate messageId");
                (false, false)
            } else {
                let queue_was_empty = store.enqueue(directive.message_id.clone());
                let no_current = self.state.lock().current.is_none();
                (true, queue_was_empty && no_current)
            }
        };

        if registered && should_activate {
            self.activate_next();
        }
    }

    /// Pop the next queued directive (if any) and begin its focus request
    /// (I1/I2: `current` is set exactly when a directive is gaining,
    /// holding, or losing focus).
    fn activate_next(&self) {
        let next_id = {
            let mut store = self.store.lock();
            store.dequeue_head()
        };
        let Some(next_id) = next_id else {
            return;
        };

        let token = {
            let store = self.store.lock();
            match store.lookup(&next_id) {
                Some(record) => record.token.clone(),
                None => return, // cancelled between enqueue and activation
            }
        };

        {
            let mut state = self.state.lock();
            debug_assert!(state.current.is_none(), "I1: at most one current directive");
            state.current = Some(next_id.clone());
            state.current_token = Some(token);
            state.playback = PlaybackState::GainingFocus;
            state.desired = PlaybackState::Playing;
        }
        debug_assert!(
            self.store.lock().contains(&next_id),
            "I2: current record must still be present in the directive map"
        );
        self.publish_context();

        if !self.focus_manager.request_foreground(&self.focus_channel) {
            self.fail_current(ExceptionCode::ChannelAcquisitionFailed, "focus request rejected");
        }
        // Otherwise: wait for `on_focus_changed(Foreground)` to arrive.
    }

    fn on_focus_changed(&self, focus: FocusState) {
        let (playback, has_current) = {
            let mut state = self.state.lock();
            state.focus = focus;
            (state.playback, state.current.is_some())
        };

        if has_current {
            match (playback, focus) {
                (PlaybackState::GainingFocus, FocusState::Foreground) => self.start_playback(),
                (PlaybackState::Playing, FocusState::Foreground) => {} // already foreground, no-op
                (PlaybackState::Playing, FocusState::Background | FocusState::None) => {
                    self.begin_losing_focus();
                }
                (PlaybackState::LosingFocus, FocusState::Foreground) => {
                    // regained focus before media actually stopped
                    let mut state = self.state.lock();
                    state.playback = PlaybackState::Playing;
                    state.desired = PlaybackState::Playing;
                    drop(state);
                    self.publish_context();
                }
                _ => {}
            }
        }

        // Only record a settle if the machine actually caught up to its
        // desired state within this task (trivially, because nothing was
        // owed; or because `start_playback`/the regain-focus branch above
        // just ran). A focus loss mid-play leaves `LosingFocus` pending
        // `desired == Finished` here — no settle yet, so a blocked caller
        // correctly keeps waiting for the later `on_media_finished`/
        // `on_media_error` task to retire the directive.
        let mut state = self.state.lock();
        if state.reached_desired() {
            state.settle_epoch += 1;
            drop(state);
            self.wake_waiters();
        }
    }

    fn start_playback(&self) {
        let (message_id, attachment_id) = {
            let store = self.store.lock();
            let state = self.state.lock();
            let Some(id) = state.current.clone() else {
                return;
            };
            match store.lookup(&id) {
                Some(record) => (id, record.attachment_id.clone()),
                None => return,
            }
        };

        let opened = self
            .attachment_store
            .open(&attachment_id)
            .and_then(|reader| self.media_player.set_source(reader))
            .and_then(|_| self.media_player.play());

        match opened {
            Ok(()) => {
                let token = {
                    let mut store = self.store.lock();
                    let mut state = self.state.lock();
                    state.playback = PlaybackState::Playing;
                    state.desired = PlaybackState::Playing;
                    if let Some(record) = store.lookup_mut(&message_id) {
                        record.mark_started();
                    }
                    state.current_token.clone()
                };
                if let Some(token) = token {
                    self.event_sink
                        .emit_speech_started(events::speech_started(token.as_str()));
                }
                self.observers.notify(super::state::PlayerActivity::Playing);
                self.publish_context();
                self.wake_waiters();
            }
            Err(description) => {
                self.fail_current(ExceptionCode::InternalError, &description);
            }
        }
    }

    /// Focus degraded below foreground while playing: ask the player to
    /// stop and transition to `LosingFocus` pending its acknowledgement.
    /// `stop()` is a request, not a guarantee — the directive is only
    /// retired (as completed, not failed: yielding the channel is not an
    /// error, §9 open question resolved in DESIGN.md) once `on_media_finished`
    /// or `on_media_error` actually arrives, same as a natural finish.
    fn begin_losing_focus(&self) {
        {
            let mut state = self.state.lock();
            state.playback = PlaybackState::LosingFocus;
            state.desired = PlaybackState::Finished;
        }
        self.publish_context();
        self.media_player.stop();
    }

    fn on_media_started(&self) {
        // Informational in this model: `start_playback` already transitions
        // to `Playing` synchronously once `play()` returns `Ok`. Kept as a
        // distinct task so a real asynchronous media player can drive the
        // same transition from its own callback thread.
        let has_current = self.state.lock().current.is_some();
        if has_current {
            self.wake_waiters();
        }
    }

    fn on_media_finished(&self) {
        self.retire_current(Retirement::Completed);
    }

    fn on_media_error(&self, description: String) {
        self.fail_current(ExceptionCode::InternalError, &description);
    }

    fn fail_current(&self, code: ExceptionCode, description: &str) {
        self.event_sink
            .emit_exception(events::exception_report(&code, description));
        self.retire_current(Retirement::Failed(DirectiveFailure::new(code, description.to_string())));
    }

    /// Tear down the current record: release focus if held, mark playback
    /// `Finished`, advance the queue, and — unless cancelled (§4.7) — report
    /// upstream exactly once (I3) and emit `SpeechFinished` if (and only if)
    /// `SpeechStarted` ever fired (P1).
    fn retire_current(&self, retirement: Retirement) {
        let had_focus_request = {
            let state = self.state.lock();
            debug_assert_eq!(
                state.current.is_some(),
                matches!(
                    state.playback,
                    PlaybackState::GainingFocus | PlaybackState::Playing | PlaybackState::LosingFocus
                ),
                "I1/I2: current is set iff playback is gaining/holding/losing focus"
            );
            matches!(
                state.playback,
                PlaybackState::GainingFocus | PlaybackState::Playing | PlaybackState::LosingFocus
            )
        };
        if had_focus_request {
            self.focus_manager.release(&self.focus_channel);
        }

        let retired_id = {
            let mut state = self.state.lock();
            let id = state.current.take();
            state.current_token = None;
            state.playback = PlaybackState::Finished;
            state.desired = PlaybackState::Finished;
            state.settle_epoch += 1;
            id
        };
        self.wake_waiters();

        if let Some(id) = retired_id {
            let removed = {
                let mut store = self.store.lock();
                store.remove(&id)
            };
            if let Some(mut record) = removed {
                match retirement {
                    Retirement::Cancelled => {
                        // I3: both flags still clear exactly once, just
                        // without ever invoking a callback or emitting
                        // `SpeechFinished` for them.
                        record.take_send_finished();
                        record.take_send_completed();
                    }
                    Retirement::Completed => {
                        if record.started && record.take_send_finished() {
                            self.event_sink
                                .emit_speech_finished(events::speech_finished(record.token.as_str()));
                        }
                        record.report_completed();
                    }
                    Retirement::Failed(failure) => {
                        if record.started && record.take_send_finished() {
                            self.event_sink
                                .emit_speech_finished(events::speech_finished(record.token.as_str()));
                        }
                        record.report_failed(failure.description);
                    }
                }
            }
        }

        self.observers.notify(super::state::PlayerActivity::Finished);
        self.publish_context();
        self.wake_waiters();
        self.activate_next();
    }

    /// Cancel a directive, whether it is the currently-playing one or
    /// still queued (§4.7).
    fn cancel(&self, message_id: MessageId) {
        let is_current = self.state.lock().current.as_ref() == Some(&message_id);

        if is_current {
            self.media_player.stop();
            self.retire_current(Retirement::Cancelled);
            return;
        }

        let removed = {
            let mut store = self.store.lock();
            let found = store.remove_from_queue(&message_id);
            if found {
                store.remove(&message_id)
            } else {
                None
            }
        };

        if let Some(mut record) = removed {
            // Never started: no `SpeechFinished`, just an upstream completion.
            record.report_completed();
        } else {
            info!(target: "speech_synthesizer::coordinator", %message_id, "cancel of unknown messageId ignored");
        }
    }

    fn publish_context(&self) {
        let (token, playback) = {
            let state = self.state.lock();
            (state.current_token.clone(), state.playback)
        };
        let offset_ms = self.media_player.offset_ms();
        let payload = context::build(token.as_ref().map(|t| t.as_str()), offset_ms, playback);
        self.context_manager.publish_context(payload);
    }

    fn wake_waiters(&self) {
        self.state_cv.notify_all();
    }
}
