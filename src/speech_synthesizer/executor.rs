//! Serial executor: a dedicated OS thread draining a bounded task channel,
//! so every mutation of playback/focus state happens on one thread in
//! arrival order (§5).
//!
//! Grounded on the teacher's `player::audio::audio_thread_main`: a named
//! thread owns a `crossbeam_channel::Receiver`, blocks on `recv()` when
//! idle, and hands each message to a single dispatch point. This module
//! generalizes that to an arbitrary task type and handler closure instead
//! of the teacher's fixed `PlayerCommand` match.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::error::{Result, SynthesizerError};

use super::record::MessageId;
use super::state::FocusState;

/// Units of work accepted by the serial executor. Every public mutating
/// method of [`super::SpeechSynthesizer`] builds one of these and submits
/// it rather than mutating state directly on the caller's thread.
pub enum ExecutorTask {
    Handle(super::directive::SpeakDirective, Option<Box<dyn super::collaborators::ResultCallback>>),
    Cancel(MessageId),
    OnFocusChanged(FocusState),
    OnMediaStarted,
    OnMediaFinished,
    OnMediaError(String),
    /// Processed last; drains any remaining buffered tasks (bounded by a
    /// deadline) before the thread exits.
    Shutdown,
}

impl std::fmt::Debug for ExecutorTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorTask::Handle(d, _) => write!(f, "Handle({:?})", d.message_id),
            ExecutorTask::Cancel(id) => write!(f, "Cancel({id:?})"),
            ExecutorTask::OnFocusChanged(focus) => write!(f, "OnFocusChanged({focus:?})"),
            ExecutorTask::OnMediaStarted => write!(f, "OnMediaStarted"),
            ExecutorTask::OnMediaFinished => write!(f, "OnMediaFinished"),
            ExecutorTask::OnMediaError(msg) => write!(f, "OnMediaError({msg})"),
            ExecutorTask::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Owns the task channel and the worker thread. Dropping without calling
/// [`Self::shutdown`] leaves the thread running (detached) until the
/// sender side is dropped, at which point `recv()` returns an error and
/// the loop exits on its own.
pub struct Executor {
    sender: Sender<ExecutorTask>,
    handle: Option<JoinHandle<()>>,
}

impl Executor {
    /// Spawn the worker thread. `handler` is called once per ordinary task,
    /// always on the worker thread, in the order tasks were submitted (I4).
    /// `on_shutdown` is called exactly once, also on the worker thread, the
    /// moment a `Shutdown` sentinel is received — before the drain — so
    /// agent-level teardown (§4.8) runs serialized with every other
    /// mutation instead of racing it from the caller's thread.
    pub fn spawn<F, S>(
        queue_capacity: usize,
        shutdown_drain_timeout: Duration,
        mut handler: F,
        on_shutdown: S,
    ) -> Self
    where
        F: FnMut(ExecutorTask) + Send + 'static,
        S: FnOnce() + Send + 'static,
    {
        let (sender, receiver): (Sender<ExecutorTask>, Receiver<ExecutorTask>) =
            crossbeam_channel::bounded(queue_capacity);

        let handle = std::thread::Builder::new()
            .name("speech-synthesizer-executor".into())
            .spawn(move || {
                debug!(target: "speech_synthesizer::executor", "executor thread started");
                loop {
                    match receiver.recv() {
                        Ok(ExecutorTask::Shutdown) => {
                            on_shutdown();
                            drain_remaining(&receiver, shutdown_drain_timeout, &mut handler);
                            break;
                        }
                        Ok(task) => handler(task),
                        Err(_) => break, // sender dropped, no more tasks ever arrive
                    }
                }
                debug!(target: "speech_synthesizer::executor", "executor thread stopped");
            })
            .expect("failed to spawn speech-synthesizer-executor thread");

        Self {
            sender,
            handle: Some(handle),
        }
    }

    /// Enqueue a task. Fails with [`SynthesizerError::ExecutorClosed`] if
    /// the worker thread has already stopped.
    pub fn submit(&self, task: ExecutorTask) -> Result<()> {
        self.sender
            .send(task)
            .map_err(|_| SynthesizerError::ExecutorClosed)
    }

    /// Submit a shutdown task and join the worker thread. Idempotent:
    /// calling twice is a no-op the second time.
    pub fn shutdown(&mut self) {
        let _ = self.sender.send(ExecutorTask::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(target: "speech_synthesizer::executor", "executor thread panicked");
            }
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// After a `Shutdown` task, keep handling whatever was already queued
/// behind it (non-blocking), up to `deadline`, so in-flight work isn't
/// silently discarded on process exit.
fn drain_remaining<F>(receiver: &Receiver<ExecutorTask>, deadline: Duration, handler: &mut F)
where
    F: FnMut(ExecutorTask),
{
    let start = Instant::now();
    loop {
        let remaining = deadline.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            warn!(target: "speech_synthesizer::executor", "shutdown drain timeout elapsed with tasks still queued");
            break;
        }
        match receiver.recv_timeout(remaining) {
            Ok(ExecutorTask::Shutdown) => continue,
            Ok(task) => handler(task),
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn tasks_are_handled_in_submission_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let order_clone = order.clone();
        let executor = Executor::spawn(
            16,
            Duration::from_millis(500),
            move |task| {
                if let ExecutorTask::OnMediaError(msg) = task {
                    order_clone.lock().unwrap().push(msg);
                }
            },
            || {},
        );

        for i in 0..5 {
            executor
                .submit(ExecutorTask::OnMediaError(i.to_string()))
                .unwrap();
        }

        drop(executor); // triggers shutdown + join, draining the rest

        assert_eq!(
            *order.lock().unwrap(),
            vec!["0", "1", "2", "3", "4"]
        );
    }

    #[test]
    fn submit_after_shutdown_errors() {
        let mut executor = Executor::spawn(4, Duration::from_millis(100), |_| {}, || {});
        executor.shutdown();
        let err = executor.submit(ExecutorTask::OnMediaFinished).unwrap_err();
        assert!(matches!(err, SynthesizerError::ExecutorClosed));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut executor = Executor::spawn(4, Duration::from_millis(100), |_| {}, || {});
        executor.shutdown();
        executor.shutdown();
    }

    #[test]
    fn counts_every_submitted_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let executor = Executor::spawn(
            16,
            Duration::from_millis(500),
            move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            },
            || {},
        );
        for _ in 0..10 {
            executor.submit(ExecutorTask::OnMediaFinished).unwrap();
        }
        drop(executor);
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn on_shutdown_hook_runs_exactly_once_before_drain_completes() {
        let shutdown_calls = Arc::new(AtomicUsize::new(0));
        let shutdown_calls_clone = shutdown_calls.clone();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let order_clone = order.clone();

        let mut executor = Executor::spawn(
            16,
            Duration::from_millis(200),
            move |task| {
                if let ExecutorTask::OnMediaError(msg) = task {
                    order_clone.lock().unwrap().push(msg);
                }
            },
            move || {
                shutdown_calls_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        executor
            .submit(ExecutorTask::OnMediaError("queued-before-shutdown".to_string()))
            .unwrap();
        executor.shutdown();

        assert_eq!(shutdown_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec!["queued-before-shutdown"]);
    }
}
