//! Speech synthesizer capability agent (§1–§9).
//!
//! Sequences spoken-audio `Speak` directives against a shared audio-channel
//! focus, a media player, and a context publisher. Every mutation of
//! playback/focus state happens on one dedicated executor thread so the
//! agent never races itself, no matter how many threads call in
//! concurrently (the upstream sequencer, the focus arbiter, and the media
//! player's own callback thread all call into the same handle).
//!
//! # Architecture
//!
//! ```text
//!   handle()/cancel_directive()/on_focus_changed()/on_media_*()
//!           │  (validate, build a task, submit)
//!           ▼
//!   ExecutorTask channel (bounded, crossbeam)
//!           │
//!           ▼
//!   executor thread: Inner::handle_task  ──┬─▶ DirectiveStore (queue + map)
//!                                          └─▶ StateInner (playback/focus)
//!           │
//!           ▼
//!   MediaPlayer / FocusManager / EventSink / ContextManager (called only
//!   with no lock held)
//! ```
//!
//! `provide_state` is the one exception: it only reads, so it takes the
//! state lock directly rather than round-tripping through the executor.
//!
//! Module layout mirrors the above: [`record`] and [`store`] are the data
//! model, [`state`] is the state machine, [`executor`] is the serial
//! dispatcher, [`coordinator`] is the public API that ties them together,
//! and [`observer`]/[`context`]/[`events`]/[`directive`] are the supporting
//! cast (broadcast, outbound context, outbound events, inbound parsing).

pub mod collaborators;
pub mod context;
pub mod coordinator;
pub mod directive;
pub mod events;
pub mod executor;
pub mod observer;
pub mod record;
pub mod state;
pub mod store;

pub use collaborators::{AttachmentReader, AttachmentStore, ContextManager, EventSink, FocusManager, MediaPlayer, ResultCallback};
pub use coordinator::SpeechSynthesizer;
pub use observer::{ObserverRegistry, SpeechSynthesizerObserver};
pub use record::{DirectiveRecord, MessageId, SpeakToken};
pub use state::{FocusState, PlaybackState, PlayerActivity};
