use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt, stream};
use intellibot_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};
use serde_json::{Map, Value};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, Message, ToolCall};

type EventStream =
    Pin<Box<dyn Stream<Item = Result<ModelResponseEvent, Error>> + Send>>;
type FullMessageSlot = Arc<Mutex<Option<(String, Message)>>>;

/// The assistant message assembled from the chunks seen so far.
#[derive(Default)]
struct PartialMessage {
    id: Option<String>,
    content: String,
    reasoning_content: Option<String>,
    tool_calls: Vec<ToolCall>,
    finish_reason: Option<ModelFinishReason>,
}

impl PartialMessage {
    fn merge_tool_call(&mut self, fragment: ToolCall) {
        let Some(partial) = self
            .tool_calls
            .iter_mut()
            .find(|t| t.index == fragment.index)
        else {
            self.tool_calls.push(fragment);
            return;
        };
        if let Some(id) = fragment.id {
            partial.id.get_or_insert_default().push_str(&id);
        }
        if let Some(ty) = fragment.r#type {
            partial.r#type.get_or_insert_default().push_str(&ty);
        }
        if let Some(function) = fragment.function {
            let partial_func = partial.function.get_or_insert_default();
            if let Some(name) = function.name {
                partial_func.name.get_or_insert_default().push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                partial_func
                    .arguments
                    .get_or_insert_default()
                    .push_str(&arguments);
            }
        }
    }

    /// Some compatible servers send an empty id, which is kept as is.
    fn into_message(self) -> (String, Message) {
        let content = if self.content.is_empty() && !self.tool_calls.is_empty()
        {
            None
        } else {
            Some(self.content)
        };
        (
            self.id.unwrap_or_default(),
            Message::Assistant {
                content,
                tool_calls: (!self.tool_calls.is_empty())
                    .then_some(self.tool_calls),
                reasoning_content: self.reasoning_content,
            },
        )
    }
}

struct StreamState {
    sse: Sse,
    partial: PartialMessage,
    pending: VecDeque<ModelResponseEvent>,
    done: bool,
    full_msg: FullMessageSlot,
}

impl StreamState {
    async fn next_event(&mut self) -> Option<Result<ModelResponseEvent, Error>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }

            let data = match self.sse.next_event().await {
                Ok(Some(data)) if data != "[DONE]" => data,
                Ok(_) => {
                    self.finish();
                    continue;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(Error::new(
                        format!("malformed event stream: {err}"),
                        ErrorKind::Other,
                    )));
                }
            };
            trace!("got sse event: {data}");

            if let Err(err) = self.apply_chunk(&data) {
                self.done = true;
                return Some(Err(err));
            }
        }
    }

    fn apply_chunk(&mut self, data: &str) -> Result<(), Error> {
        let chunk = serde_json::from_str::<ChatCompletionChunk>(data)
            .map_err(|err| {
                Error::new(format!("invalid chunk: {err}"), ErrorKind::Other)
            })?;
        if !chunk.id.is_empty()
            && self.partial.id.get_or_insert_with(|| chunk.id.clone())
                != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        }

        // Usage-only chunks carry no choices.
        for choice in chunk.choices {
            let delta = choice.delta;
            if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
                self.partial.content.push_str(&content);
                self.pending
                    .push_back(ModelResponseEvent::MessageDelta(content));
            }
            if let Some(reasoning_content) = delta.reasoning_content {
                self.partial
                    .reasoning_content
                    .get_or_insert_default()
                    .push_str(&reasoning_content);
            }
            for fragment in delta.tool_calls.into_iter().flatten() {
                self.partial.merge_tool_call(fragment);
            }
            match choice.finish_reason.as_deref() {
                None => {}
                Some("tool_calls") => {
                    self.partial.finish_reason =
                        Some(ModelFinishReason::ToolCalls);
                }
                Some("content_filter") => {
                    return Err(Error::new(
                        "response was blocked by the content filter",
                        ErrorKind::Moderated,
                    ));
                }
                Some(_) => {
                    self.partial.finish_reason = Some(ModelFinishReason::Stop);
                }
            }
        }
        Ok(())
    }

    /// Emits the assembled tool calls followed by the completion event.
    fn finish(&mut self) {
        self.done = true;
        let partial = std::mem::take(&mut self.partial);

        for tool_call in &partial.tool_calls {
            self.pending
                .push_back(ModelResponseEvent::ToolCall(tool_call_request(
                    tool_call,
                )));
        }
        let finish_reason = match partial.finish_reason {
            Some(reason) => reason,
            None if !partial.tool_calls.is_empty() => {
                ModelFinishReason::ToolCalls
            }
            None => ModelFinishReason::Stop,
        };
        self.pending
            .push_back(ModelResponseEvent::Completed(finish_reason));

        *self.full_msg.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(partial.into_message());
    }
}

fn tool_call_request(tool_call: &ToolCall) -> ToolCallRequest {
    let function = tool_call.function.as_ref();
    let raw_args = function
        .and_then(|f| f.arguments.as_deref())
        .unwrap_or_default();
    let arguments = if raw_args.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(raw_args).unwrap_or_else(|err| {
            warn!("tool call arguments are not valid JSON: {err}");
            Value::String(raw_args.to_owned())
        })
    };
    ToolCallRequest {
        id: tool_call.id.clone().unwrap_or_default(),
        name: function.and_then(|f| f.name.clone()).unwrap_or_default(),
        arguments,
    }
}

/// A streamed chat completion.
pub struct OpenAIResponse {
    events: EventStream,
    full_msg: FullMessageSlot,
}

impl OpenAIResponse {
    pub fn from_sse(sse: Sse) -> Self {
        let full_msg = FullMessageSlot::default();
        let state = StreamState {
            sse,
            partial: PartialMessage::default(),
            pending: VecDeque::new(),
            done: false,
            full_msg: Arc::clone(&full_msg),
        };
        let events = stream::unfold(state, |mut state| async move {
            let event = state.next_event().await?;
            Some((event, state))
        });
        Self {
            events: Box::pin(events.fuse()),
            full_msg,
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        self.get_mut()
            .events
            .poll_next_unpin(cx)
            .map(Option::transpose)
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        let full_msg =
            self.full_msg.lock().unwrap_or_else(PoisonError::into_inner);
        full_msg
            .as_ref()
            .map(|(id, msg)| OpaqueMessage::new(id, msg.clone()))
    }
}
