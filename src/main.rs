//! Speech Synthesizer Capability Agent — demonstration binary.
//!
//! Wires a [`speech_synthesizer::SpeechSynthesizer`] to the in-memory
//! collaborator fakes from [`speech_synthesizer::collaborators::mocks`] and
//! drives one of the named scenarios end to end, printing every emitted
//! event, exception, and context snapshot as it happens. There is no real
//! media player, focus arbiter, or cloud transport here — those are all
//! out of scope (§1) — so this binary exists purely to exercise the state
//! machine the way the test suite does, but with visible output.

pub mod config;
pub mod error;
pub mod speech_synthesizer;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::SynthesizerConfig;
use speech_synthesizer::collaborators::mocks::{
    InMemoryAttachmentStore, RecordingContextManager, RecordingEventSink, RecordingResultCallback,
    ScriptedFocusManager, ScriptedMediaPlayer,
};
use speech_synthesizer::state::FocusState;
use speech_synthesizer::SpeechSynthesizer;

#[derive(Parser)]
#[command(name = "speech-synthesizer-agent", version, about)]
struct Cli {
    /// Path to a TOML config file. Falls back to defaults when absent.
    #[arg(long, env = "SYNTHESIZER_CONFIG", default_value = "synthesizer.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one of the built-in demonstration scenarios against the fakes.
    Demo {
        #[arg(value_enum)]
        scenario: Scenario,
    },
    /// Print the effective configuration and exit.
    PrintConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scenario {
    /// A single `Speak` directive plays to completion.
    SingleSpeak,
    /// Two directives arrive back to back; the second plays only after
    /// the first finishes, strict FIFO.
    RapidBackToBack,
    /// A queued (not yet playing) directive is cancelled before its turn.
    CancelWhileQueued,
    /// The currently-playing directive is cancelled mid-utterance.
    CancelWhilePlaying,
    /// The focus manager rejects the foreground request outright.
    FocusRejected,
    /// The media player fails to start; the next queued directive still plays.
    MediaErrorRecovery,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::from_default_env()
                .add_directive("speech_synthesizer_agent=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = SynthesizerConfig::load(&cli.config);

    match cli.command {
        Command::PrintConfig => {
            println!("{}", toml::to_string_pretty(&cfg)?);
            Ok(())
        }
        Command::Demo { scenario } => run_demo(scenario, &cfg),
    }
}

fn run_demo(scenario: Scenario, cfg: &SynthesizerConfig) -> anyhow::Result<()> {
    let attachments = InMemoryAttachmentStore::new();
    let player = ScriptedMediaPlayer::new();
    let focus = ScriptedFocusManager::new();
    let events = RecordingEventSink::new();
    let context = RecordingContextManager::new();

    let synth = SpeechSynthesizer::new(
        Box::new(attachments.clone()),
        Box::new(player.clone()),
        Box::new(focus.clone()),
        Box::new(events.clone()),
        Box::new(context.clone()),
        cfg.focus_channel.clone(),
        cfg.executor_queue_capacity,
        cfg.shutdown_drain_timeout,
    );

    attachments.insert("attach-1", b"utterance one".to_vec());
    attachments.insert("attach-2", b"utterance two".to_vec());

    info!(target: "speech_synthesizer_agent", "running scenario");
    let settle = || std::thread::sleep(Duration::from_millis(30));

    match scenario {
        Scenario::SingleSpeak => {
            let cb = RecordingResultCallback::new();
            synth.handle(
                "m1",
                r#"{"token":"tok-1","url":"cid:attach-1"}"#,
                Some(Box::new(cb.clone())),
            )?;
            settle();
            synth.on_focus_changed(FocusState::Foreground)?;
            synth.on_media_finished()?;
            settle();
            println!("completed: {}", cb.completed_count());
        }
        Scenario::RapidBackToBack => {
            synth.handle("m1", r#"{"token":"tok-1","url":"cid:attach-1"}"#, None)?;
            synth.handle("m2", r#"{"token":"tok-2","url":"cid:attach-2"}"#, None)?;
            settle();
            synth.on_focus_changed(FocusState::Foreground)?;
            synth.on_media_finished()?;
            settle();
            synth.on_focus_changed(FocusState::Foreground)?;
            synth.on_media_finished()?;
            settle();
        }
        Scenario::CancelWhileQueued => {
            synth.handle("m1", r#"{"token":"tok-1","url":"cid:attach-1"}"#, None)?;
            synth.handle("m2", r#"{"token":"tok-2","url":"cid:attach-2"}"#, None)?;
            settle();
            synth.cancel_directive("m2")?;
            settle();
            synth.on_focus_changed(FocusState::Foreground)?;
            synth.on_media_finished()?;
            settle();
        }
        Scenario::CancelWhilePlaying => {
            synth.handle("m1", r#"{"token":"tok-1","url":"cid:attach-1"}"#, None)?;
            settle();
            synth.on_focus_changed(FocusState::Foreground)?;
            synth.cancel_directive("m1")?;
            settle();
        }
        Scenario::FocusRejected => {
            let cb = RecordingResultCallback::new();
            focus.reject_next_request();
            synth.handle(
                "m1",
                r#"{"token":"tok-1","url":"cid:attach-1"}"#,
                Some(Box::new(cb.clone())),
            )?;
            settle();
            println!("failed: {}", cb.failed_count());
        }
        Scenario::MediaErrorRecovery => {
            player.fail_next_play("decode failure");
            synth.handle("m1", r#"{"token":"tok-1","url":"cid:attach-1"}"#, None)?;
            synth.handle("m2", r#"{"token":"tok-2","url":"cid:attach-2"}"#, None)?;
            settle();
            synth.on_focus_changed(FocusState::Foreground)?;
            settle();
            synth.on_focus_changed(FocusState::Foreground)?;
            settle();
        }
    }

    for event in events.events() {
        println!("{event:?}");
    }
    for snapshot in context.snapshots() {
        println!("context: {snapshot}");
    }

    synth.shutdown();
    Ok(())
}
