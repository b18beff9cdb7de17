//! The agent loop.

mod builder;
mod error;

use std::sync::Arc;

use intellibot_model::{
    ModelMessage, ModelRequest, ToolCallRequest, ToolCallResult,
};
use tracing::Instrument;

use crate::conversation::{Conversation, Item as ConversationItem};
use crate::model_client::{ModelClient, ModelClientResponse};
use crate::tool::Registry as ToolRegistry;
use crate::TranscriptSource;
pub use builder::AgentBuilder;
pub use error::Error;

pub(crate) type DeltaCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub(crate) type TranscriptCallback =
    Box<dyn Fn(&str, TranscriptSource) + Send + Sync>;
pub(crate) type ToolCallCallback = Box<dyn Fn(&ToolCallRequest) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Callbacks {
    pub on_message_delta: Option<DeltaCallback>,
    pub on_transcript: Option<TranscriptCallback>,
    pub on_tool_call: Option<ToolCallCallback>,
}

/// An agent that answers user input, calling tools when the model asks.
///
/// Each [`Agent::send_message`] call is one turn. Within a turn the agent
/// keeps sampling the model, running every requested tool and feeding the
/// outputs back, until the model replies without asking for tools. The
/// conversation carries over between turns.
pub struct Agent {
    model_client: ModelClient,
    tools: ToolRegistry,
    conversation: Conversation,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    max_steps: usize,
    callbacks: Callbacks,
}

impl Agent {
    /// Runs one turn and returns the assistant's text for it.
    ///
    /// Text deltas are reported through the `on_message_delta` callback as
    /// they stream in. If the turn fails, the conversation is left as it was
    /// before the call.
    pub async fn send_message(&mut self, input: &str) -> Result<String, Error> {
        let checkpoint = self.conversation.items.len();
        let result = self
            .run_turn(input)
            .instrument(debug_span!("agent turn"))
            .await;
        if let Err(err) = &result {
            warn!("turn failed: {err}");
            self.conversation.items.truncate(checkpoint);
        }
        result
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    async fn run_turn(&mut self, input: &str) -> Result<String, Error> {
        self.push_item(
            ModelMessage::User(input.to_owned()),
            input.to_owned(),
            TranscriptSource::User,
        );

        let mut reply = String::new();
        for step in 1..=self.max_steps {
            debug!("model step {step}/{}", self.max_steps);
            let request = self.build_model_request();
            let on_delta = self.callbacks.on_message_delta.clone();
            let resp = self
                .model_client
                .send_request(request, move |delta| {
                    if let Some(on_delta) = &on_delta {
                        on_delta(delta);
                    }
                })
                .await
                .map_err(Error::Model)?;

            let ModelClientResponse {
                transcript,
                opaque_msg,
                tool_calls,
                finish_reason,
            } = resp;
            trace!(
                "step {step} finished with {finish_reason:?}, {} tool call(s)",
                tool_calls.len()
            );

            let msg = match opaque_msg {
                Some(opaque_msg) => ModelMessage::Opaque(opaque_msg),
                // Downgrade to a text-only message.
                None => ModelMessage::Assistant(transcript.clone()),
            };
            reply.push_str(&transcript);
            self.push_item(msg, transcript, TranscriptSource::Assistant);

            if tool_calls.is_empty() {
                return Ok(reply);
            }
            for call in tool_calls {
                self.run_tool_call(call).await;
            }
        }
        Err(Error::StepLimitExceeded(self.max_steps))
    }

    async fn run_tool_call(&mut self, call: ToolCallRequest) {
        if let Some(on_tool_call) = &self.callbacks.on_tool_call {
            on_tool_call(&call);
        }
        let content = match self.tools.execute(&call).await {
            Ok(output) => output,
            Err(err) => {
                debug!("tool {} failed: {err}", call.name);
                format!("Error: {err}")
            }
        };
        self.push_item(
            ModelMessage::Tool(ToolCallResult {
                id: call.id,
                content: content.clone(),
            }),
            content,
            TranscriptSource::Tool,
        );
    }

    fn push_item(
        &mut self,
        msg: ModelMessage,
        transcript: String,
        source: TranscriptSource,
    ) {
        if let Some(on_transcript) = &self.callbacks.on_transcript {
            if !transcript.is_empty() {
                on_transcript(&transcript, source);
            }
        }
        self.conversation.items.push(ConversationItem {
            msg,
            transcript,
            source,
        });
    }

    fn build_model_request(&self) -> ModelRequest {
        let system = self
            .system_prompt
            .iter()
            .map(|prompt| ModelMessage::System(prompt.clone()));
        let history = self.conversation.items.iter().map(|i| i.msg.clone());
        ModelRequest {
            messages: system.chain(history).collect(),
            tools: self.tools.definitions(),
            temperature: self.temperature,
        }
    }
}
