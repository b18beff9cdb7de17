use std::sync::Arc;

use intellibot_model::{ModelProvider, ToolCallRequest};

use super::{Agent, Callbacks};
use crate::conversation::Conversation;
use crate::model_client::ModelClient;
use crate::tool::{AnyTool, Registry as ToolRegistry, Tool, ToolObject};
use crate::{RetryPolicy, TranscriptSource};

const DEFAULT_MAX_STEPS: usize = 25;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    max_steps: usize,
    tools: Vec<Box<dyn ToolObject>>,
    callbacks: Callbacks,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_prompt: None,
            temperature: None,
            max_steps: DEFAULT_MAX_STEPS,
            tools: vec![],
            callbacks: Callbacks::default(),
        }
    }

    /// Sets the system prompt sent ahead of every request.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Limits how many model requests one turn may make. Defaults to 25.
    #[inline]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Sets how transient model failures are retried.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.model_client.set_retry_policy(retry_policy);
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(AnyTool(tool)));
        self
    }

    /// Attaches a callback to be invoked with each streamed text delta.
    #[inline]
    pub fn on_message_delta(
        mut self,
        on_message_delta: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_message_delta = Some(Arc::new(on_message_delta));
        self
    }

    /// Attaches a callback to be invoked when a conversation item is added.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_transcript = Some(Box::new(on_transcript));
        self
    }

    /// Attaches a callback to be invoked before a tool runs.
    #[inline]
    pub fn on_tool_call(
        mut self,
        on_tool_call: impl Fn(&ToolCallRequest) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_tool_call = Some(Box::new(on_tool_call));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        Agent {
            model_client: self.model_client,
            tools: ToolRegistry::with_tools(self.tools),
            conversation: Conversation::default(),
            system_prompt: self.system_prompt,
            temperature: self.temperature,
            max_steps: self.max_steps,
            callbacks: self.callbacks,
        }
    }
}
