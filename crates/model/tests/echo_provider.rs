use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll};

use intellibot_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
};

#[derive(Debug)]
struct EchoError(ErrorKind);

impl Display for EchoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "echo failed: {}", self.0)
    }
}

impl Error for EchoError {}

impl ModelProviderError for EchoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Replies with the last user message, one word per delta.
struct EchoResponse {
    events: VecDeque<ModelResponseEvent>,
}

impl ModelResponse for EchoResponse {
    type Error = EchoError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.get_mut().events.pop_front()))
    }
}

struct EchoProvider;

impl ModelProvider for EchoProvider {
    type Error = EchoError;
    type Response = EchoResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let last_user = req.messages.iter().rev().find_map(|msg| match msg {
            ModelMessage::User(text) => Some(text.clone()),
            _ => None,
        });
        let result = match last_user {
            Some(text) => {
                let reply = format!("You said {text}");
                let mut events: VecDeque<_> = reply
                    .split_inclusive(' ')
                    .map(|word| ModelResponseEvent::MessageDelta(word.to_owned()))
                    .collect();
                events.push_back(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ));
                Ok(EchoResponse { events })
            }
            None => Err(EchoError(ErrorKind::Other)),
        };
        ready(result)
    }
}

async fn collect_text(mut resp: EchoResponse) -> (String, ModelFinishReason) {
    let mut text = String::new();
    let mut finish_reason = None;
    while let Some(event) =
        poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::Completed(reason) => finish_reason = Some(reason),
            ModelResponseEvent::ToolCall(req) => {
                unreachable!("unexpected tool call: {req:?}")
            }
        }
    }
    (text, finish_reason.unwrap())
}

#[tokio::test]
async fn test_streamed_completion() {
    let req = ModelRequest {
        messages: vec![
            ModelMessage::System("Be brief.".to_owned()),
            ModelMessage::User("Good morning".to_owned()),
        ],
        ..Default::default()
    };
    let resp = EchoProvider.send_request(&req).await.unwrap();
    assert!(resp.make_opaque_message().is_none());

    let (text, reason) = collect_text(resp).await;
    assert_eq!(text, "You said Good morning");
    assert_eq!(reason, ModelFinishReason::Stop);
}

#[tokio::test]
async fn test_request_error() {
    let req = ModelRequest::default();
    let err = EchoProvider.send_request(&req).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(!err.kind().is_transient());
    assert_eq!(err.to_string(), "echo failed: model error");
}
