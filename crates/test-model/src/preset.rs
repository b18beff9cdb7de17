use intellibot_model::{ErrorKind, ToolCallRequest};
use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallRequest),
}

/// The preset response for one model request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the first `failures` attempts at this response fail.
    /// `Some(0)` means every attempt fails.
    #[serde(default)]
    pub failures: Option<u64>,
    /// The kind of error the failing attempts report.
    #[serde(default = "default_failure_kind")]
    pub failure_kind: ErrorKind,
}

fn default_failure_kind() -> ErrorKind {
    ErrorKind::RateLimitExceeded
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
            failure_kind: default_failure_kind(),
        }
    }

    /// Creates a text-only response, streamed one word at a time.
    pub fn text(text: &str) -> Self {
        Self::with_events(
            text.split_inclusive(' ')
                .map(|word| PresetEvent::MessageDelta(word.to_owned()))
                .collect::<Vec<_>>(),
        )
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Sets the kind of error reported by failing attempts.
    #[inline]
    pub fn with_failure_kind(mut self, kind: ErrorKind) -> Self {
        self.failure_kind = kind;
        self
    }

    #[inline]
    pub(crate) fn has_tool_call(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, PresetEvent::ToolCall(_)))
    }
}
