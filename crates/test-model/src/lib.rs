//! A scripted fake model for testing the agent without a network.
//!
//! Load a [`TestModelProvider`] with the responses the "model" should give,
//! in order. Every request consumes the next scripted response, so a turn
//! with two tool rounds needs three responses. Requests are recorded and can
//! be inspected after the fact.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use intellibot_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, OpaqueMessage,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: VecDeque<ModelResponseEvent>,
    transcript: String,
    id: String,
    delay: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TestModelResponse {
    fn new(preset: PresetResponse, id: String, delay: Option<Duration>) -> Self {
        let finish_reason = if preset.has_tool_call() {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        };
        let mut transcript = String::new();
        let mut events: VecDeque<_> = preset
            .events
            .into_iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(delta) => {
                    transcript.push_str(&delta);
                    ModelResponseEvent::MessageDelta(delta)
                }
                PresetEvent::ToolCall(req) => ModelResponseEvent::ToolCall(req),
            })
            .collect();
        events.push_back(ModelResponseEvent::Completed(finish_reason));
        Self {
            events,
            transcript,
            id,
            delay,
            sleep: None,
        }
    }
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if this.events.is_empty() {
            return Poll::Ready(Ok(None));
        }
        if let Some(delay) = this.delay {
            let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;
        }
        Poll::Ready(Ok(this.events.pop_front()))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        Some(OpaqueMessage::new(&self.id, self.transcript.clone()))
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    failed_attempts: u64,
    requests: Vec<ModelRequest>,
    delay: Option<Duration>,
}

/// A local fake model for testing purpose.
///
/// Clones share the same script, so keep a clone around to inspect the
/// recorded requests after handing the provider to an agent. When the script
/// runs out, requests fail with [`ErrorKind::Other`].
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
}

impl TestModelProvider {
    /// Appends a response to the script.
    #[inline]
    pub fn add_response(&self, preset: PresetResponse) {
        self.lock().responses.push_back(preset);
    }

    /// Delays every event of subsequent responses by `duration`.
    #[inline]
    pub fn set_delay(&self, duration: Duration) {
        self.lock().delay = Some(duration);
    }

    /// Returns every request received so far, including failed attempts.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of scripted responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().responses.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(
        &self,
        req: &ModelRequest,
    ) -> Result<TestModelResponse, Error> {
        let mut script = self.lock();
        script.requests.push(req.clone());
        let attempt = script.requests.len();

        let Some(preset) = script.responses.pop_front() else {
            return Err(Error {
                message: "conversation script exhausted",
                kind: ErrorKind::Other,
            });
        };
        let should_fail = match preset.failures {
            Some(0) => true,
            Some(failures) => script.failed_attempts < failures,
            None => false,
        };
        if should_fail {
            script.failed_attempts += 1;
            let kind = preset.failure_kind;
            script.responses.push_front(preset);
            return Err(Error {
                message: "scripted failure",
                kind,
            });
        }

        script.failed_attempts = 0;
        let delay = script.delay;
        Ok(TestModelResponse::new(preset, format!("msg:{attempt}"), delay))
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.next_response(req))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use intellibot_model::{ModelMessage, ToolCallRequest};
    use serde_json::json;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, Vec<ToolCallRequest>, ModelFinishReason, OpaqueMessage) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut tool_calls = vec![];
        let mut finish_reason = None;
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            match event {
                ModelResponseEvent::Completed(reason) => {
                    finish_reason = Some(reason);
                }
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
                ModelResponseEvent::ToolCall(req) => tool_calls.push(req),
            }
        }
        let opaque = resp.make_opaque_message().unwrap();
        (msg, tool_calls, finish_reason.unwrap(), opaque)
    }

    fn user_request(text: &str) -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User(text.to_owned())],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_scripted_responses() {
        let provider = TestModelProvider::default();
        provider.set_delay(Duration::from_millis(1));
        provider.add_response(PresetResponse::text("Hello, world!"));
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Checking.".to_owned()),
            PresetEvent::ToolCall(ToolCallRequest {
                id: "call_1".to_owned(),
                name: "current_datetime".to_owned(),
                arguments: json!({}),
            }),
        ]));

        let resp = provider.send_request(&user_request("Hi")).await.unwrap();
        let (msg, tool_calls, reason, opaque) = collect_response(resp).await;
        assert_eq!(msg, "Hello, world!");
        assert!(tool_calls.is_empty());
        assert_eq!(reason, ModelFinishReason::Stop);
        assert_eq!(opaque.get::<String>().unwrap(), "Hello, world!");

        let resp = provider
            .send_request(&user_request("What time is it?"))
            .await
            .unwrap();
        let (msg, tool_calls, reason, _) = collect_response(resp).await;
        assert_eq!(msg, "Checking.");
        assert_eq!(tool_calls.len(), 1);
        assert_eq!(tool_calls[0].name, "current_datetime");
        assert_eq!(reason, ModelFinishReason::ToolCalls);

        assert_eq!(provider.remaining(), 0);
        assert_eq!(provider.requests().len(), 2);
        let err = provider.send_request(&user_request("More?")).await.err();
        assert_eq!(err.unwrap().kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::text("Finally.").with_failures(2));

        for _ in 0..2 {
            let err = provider.send_request(&user_request("Hi")).await.err();
            assert_eq!(err.unwrap().kind(), ErrorKind::RateLimitExceeded);
        }
        let resp = provider.send_request(&user_request("Hi")).await.unwrap();
        let (msg, ..) = collect_response(resp).await;
        assert_eq!(msg, "Finally.");
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure() {
        let provider = TestModelProvider::default();
        provider.add_response(
            PresetResponse::text("Never.")
                .with_failures(0)
                .with_failure_kind(ErrorKind::Unauthorized),
        );
        for _ in 0..3 {
            let err = provider.send_request(&user_request("Hi")).await.err();
            assert_eq!(err.unwrap().kind(), ErrorKind::Unauthorized);
        }
        assert_eq!(provider.remaining(), 1);
    }
}
