//! Tool call supports.

mod error;
mod registry;

use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use error::{Error, ErrorKind};
pub(crate) use registry::Registry;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations should be stateless from the model's point of view:
/// calling a tool twice with the same input should not depend on earlier
/// calls. Injected sources such as a clock or a random generator are fine,
/// as long as they are set when the tool is created.
pub trait Tool: Send + Sync + 'static {
    /// The arguments object the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description the model uses to pick this tool.
    fn description(&self) -> &str;

    /// Returns the JSON schema of [`Tool::Input`].
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}

pub(crate) type BoxedToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    fn execute(&self, arguments: Value) -> BoxedToolFuture;
}

pub(crate) struct AnyTool<T: Tool>(pub T);

impl<T: Tool> ToolObject for AnyTool<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn execute(&self, arguments: Value) -> BoxedToolFuture {
        // Models often send nothing at all for parameterless tools.
        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            arguments => arguments,
        };
        match serde_json::from_value::<T::Input>(arguments) {
            Ok(input) => Box::pin(self.0.execute(input)),
            Err(err) => Box::pin(std::future::ready(Err(
                Error::invalid_input().with_reason(err.to_string()),
            ))),
        }
    }
}
