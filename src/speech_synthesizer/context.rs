//! Context payload construction (§4.8, §6): `{token, offsetInMilliseconds,
//! playerActivity}`, published to the context manager on every state
//! transition and on explicit request.

use serde::Serialize;

use super::state::PlaybackState;

#[derive(Debug, Serialize)]
struct ContextPayload<'a> {
    token: &'a str,
    #[serde(rename = "offsetInMilliseconds")]
    offset_in_milliseconds: i64,
    #[serde(rename = "playerActivity")]
    player_activity: &'static str,
}

/// Build the `SpeechState` context payload for the current record's token
/// (empty string when there is no current record), the player's reported
/// offset, and the collapsed two-valued player activity.
pub fn build(token: Option<&str>, offset_ms: i64, playback: PlaybackState) -> serde_json::Value {
    serde_json::to_value(ContextPayload {
        token: token.unwrap_or(""),
        offset_in_milliseconds: offset_ms,
        player_activity: playback.player_activity().as_str(),
    })
    .expect("ContextPayload is always representable as JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_finished_context_with_no_current_token() {
        let value = build(None, 0, PlaybackState::Finished);
        assert_eq!(value["token"], "");
        assert_eq!(value["offsetInMilliseconds"], 0);
        assert_eq!(value["playerActivity"], "FINISHED");
    }

    #[test]
    fn builds_playing_context_with_offset() {
        let value = build(Some("tok-1"), 4200, PlaybackState::Playing);
        assert_eq!(value["token"], "tok-1");
        assert_eq!(value["offsetInMilliseconds"], 4200);
        assert_eq!(value["playerActivity"], "PLAYING");
    }

    #[test]
    fn losing_focus_still_reports_playing_activity() {
        let value = build(Some("tok-1"), 100, PlaybackState::LosingFocus);
        assert_eq!(value["playerActivity"], "PLAYING");
    }
}
