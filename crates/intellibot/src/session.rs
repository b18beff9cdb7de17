use std::sync::Arc;

use intellibot_core::agent::Error as AgentError;
use intellibot_core::{Agent, AgentBuilder, RetryPolicy, TranscriptSource};
use intellibot_model::{ModelProvider, ToolCallRequest};

use crate::clock::{Clock, SystemClock};
use crate::tools::*;

const SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    clock: Arc<dyn Clock>,
    picker: Option<Picker>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    ///
    /// The session samples at temperature 0 with the built-in system prompt
    /// unless told otherwise.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider)
            .with_system_prompt(SYSTEM_PROMPT.trim())
            .with_temperature(0.0);
        Self {
            agent_builder,
            clock: Arc::new(SystemClock),
            picker: None,
        }
    }

    /// Replaces the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Sets the retry policy for transient model failures.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.agent_builder = self.agent_builder.with_retry_policy(retry_policy);
        self
    }

    /// Sets the clock read by `current_datetime`.
    #[inline]
    pub fn with_clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Seeds the generator behind `joke_generator` and `quote_of_the_day`.
    #[inline]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.picker = Some(Picker::seeded(seed));
        self
    }

    /// Attaches a callback to be invoked with each streamed text delta.
    #[inline]
    pub fn on_message_delta(
        mut self,
        on_message_delta: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder =
            self.agent_builder.on_message_delta(on_message_delta);
        self
    }

    /// Attaches a callback to be invoked when a transcript is generated.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Attaches a callback to be invoked before a tool runs.
    #[inline]
    pub fn on_tool_call(
        mut self,
        on_tool_call: impl Fn(&ToolCallRequest) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_tool_call(on_tool_call);
        self
    }

    /// Builds a new session with every built-in tool registered.
    pub fn build(self) -> Session {
        let picker = self.picker.unwrap_or_default();
        let agent = self
            .agent_builder
            .with_tool(BasicMathTool::new())
            .with_tool(UnitConverterTool::new())
            .with_tool(CurrentDateTimeTool::with_clock(self.clock))
            .with_tool(DaysBetweenTool::new())
            .with_tool(PasswordStrengthTool::new())
            .with_tool(JokeTool::new(picker.clone()))
            .with_tool(QuoteTool::new(picker))
            .build();

        Session { agent }
    }
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session holds a fully configured agent that you can use directly, and it
/// is basically a wrapper around [`Agent`].
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Sends a message and waits for the full reply.
    #[inline]
    pub async fn send_message(
        &mut self,
        message: &str,
    ) -> Result<String, AgentError> {
        self.agent.send_message(message).await
    }

    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}
