//! Outbound event envelopes (§4.6, §6): `SpeechStarted`, `SpeechFinished`,
//! and exception reports, all under the `SpeechSynthesizer` namespace.

use serde::Serialize;

use crate::error::ExceptionCode;

const NAMESPACE: &str = "SpeechSynthesizer";

#[derive(Debug, Serialize)]
struct Header<'a> {
    namespace: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct Payload<'a> {
    token: &'a str,
}

#[derive(Debug, Serialize)]
struct SpeechEvent<'a> {
    header: Header<'a>,
    payload: Payload<'a>,
}

/// Build the `SpeechStarted` event body for `token`.
pub fn speech_started(token: &str) -> serde_json::Value {
    serde_json::to_value(SpeechEvent {
        header: Header {
            namespace: NAMESPACE,
            name: "SpeechStarted",
        },
        payload: Payload { token },
    })
    .expect("SpeechEvent is always representable as JSON")
}

/// Build the `SpeechFinished` event body for `token`.
pub fn speech_finished(token: &str) -> serde_json::Value {
    serde_json::to_value(SpeechEvent {
        header: Header {
            namespace: NAMESPACE,
            name: "SpeechFinished",
        },
        payload: Payload { token },
    })
    .expect("SpeechEvent is always representable as JSON")
}

#[derive(Debug, Serialize)]
struct ExceptionPayload<'a> {
    code: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct ExceptionReport<'a> {
    header: Header<'a>,
    payload: ExceptionPayload<'a>,
}

/// Build an `ExceptionEncountered`-style report carrying `code`/`description`.
pub fn exception_report(code: &ExceptionCode, description: &str) -> serde_json::Value {
    serde_json::to_value(ExceptionReport {
        header: Header {
            namespace: NAMESPACE,
            name: "ExceptionEncountered",
        },
        payload: ExceptionPayload {
            code: code.as_str(),
            description,
        },
    })
    .expect("ExceptionReport is always representable as JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speech_started_shape() {
        let event = speech_started("tok-1");
        assert_eq!(event["header"]["namespace"], "SpeechSynthesizer");
        assert_eq!(event["header"]["name"], "SpeechStarted");
        assert_eq!(event["payload"]["token"], "tok-1");
    }

    #[test]
    fn speech_finished_shape() {
        let event = speech_finished("tok-1");
        assert_eq!(event["header"]["name"], "SpeechFinished");
    }

    #[test]
    fn exception_report_shape() {
        let event = exception_report(&ExceptionCode::InternalError, "decode error");
        assert_eq!(event["header"]["name"], "ExceptionEncountered");
        assert_eq!(event["payload"]["code"], "INTERNAL_ERROR");
        assert_eq!(event["payload"]["description"], "decode error");
    }
}
