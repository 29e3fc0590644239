//! Playback state, focus state, and the shared state bundle the serial
//! executor mutates under `Inner::state` (§4.3, §5).

use super::record::{MessageId, SpeakToken};

/// Playback state (§3). `Finished` is initial and terminal-between-utterances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Finished,
    GainingFocus,
    Playing,
    LosingFocus,
}

impl PlaybackState {
    /// The externally-visible, two-valued `playerActivity` of §4.6/§6,
    /// collapsing the four internal states down to the two the context
    /// manager knows about.
    pub fn player_activity(self) -> PlayerActivity {
        match self {
            PlaybackState::Playing | PlaybackState::LosingFocus => PlayerActivity::Playing,
            PlaybackState::Finished | PlaybackState::GainingFocus => PlayerActivity::Finished,
        }
    }
}

/// The two-valued activity the context manager actually sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerActivity {
    Playing,
    Finished,
}

impl PlayerActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerActivity::Playing => "PLAYING",
            PlayerActivity::Finished => "FINISHED",
        }
    }
}

/// Focus state received from the focus manager (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    None,
    Background,
    Foreground,
}

/// The mutex-guarded bundle of current/desired playback state, focus
/// state, and the current record's identity (§3 `current ≠ ∅ ⇔
/// PlaybackState ∈ {Playing, GainingFocus, LosingFocus}` — I1/I2).
///
/// Only the executor thread mutates this; other threads take the lock
/// only to read a consistent snapshot (e.g. for `provide_state`) or to
/// wait on the companion condition variable (`on_focus_changed`).
#[derive(Debug, Clone, Default)]
pub struct StateInner {
    pub playback: PlaybackState,
    pub desired: PlaybackState,
    pub focus: FocusState,
    pub current: Option<MessageId>,
    /// Token of the current record, kept alongside `current` so readers
    /// (e.g. `provide_state`) don't need a second lock on the store to
    /// build a context payload.
    pub current_token: Option<SpeakToken>,
    /// Bumped every time the machine actually settles into
    /// `reached_desired()` — trivially (nothing was owed), or because
    /// `start_playback`/the focus-regain branch caught up to a `Playing`
    /// desired state, or because `retire_current` caught up to a
    /// `Finished` one. `on_focus_changed` waits for this counter to
    /// advance past the value it observed before submitting its
    /// transition, rather than re-polling `reached_desired()` live: a
    /// later directive's queue advance (`activate_next` inside
    /// `retire_current`) can flip playback back to "not reached" again
    /// before a woken waiter gets rescheduled, so a plain
    /// `while !reached_desired() { wait() }` can miss the one instant its
    /// own transition was actually satisfied. The epoch is the one-way
    /// record that a settle happened, independent of what the queue does
    /// immediately afterward.
    pub settle_epoch: u64,
}

impl StateInner {
    /// `true` once the machine has reached `desired`, the condition
    /// `on_focus_changed` waits for.
    pub fn reached_desired(&self) -> bool {
        self.playback == self.desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_activity_collapses_four_states_to_two() {
        assert_eq!(
            PlaybackState::Playing.player_activity(),
            PlayerActivity::Playing
        );
        assert_eq!(
            PlaybackState::LosingFocus.player_activity(),
            PlayerActivity::Playing
        );
        assert_eq!(
            PlaybackState::Finished.player_activity(),
            PlayerActivity::Finished
        );
        assert_eq!(
            PlaybackState::GainingFocus.player_activity(),
            PlayerActivity::Finished
        );
    }

    #[test]
    fn default_state_is_finished_with_no_current_record() {
        let state = StateInner::default();
        assert_eq!(state.playback, PlaybackState::Finished);
        assert_eq!(state.current, None);
        assert!(state.reached_desired());
    }
}
