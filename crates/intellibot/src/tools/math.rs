use intellibot_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::format_number;

const DIVIDE_BY_ZERO: &str = "Error: Cannot divide by zero.";
const UNSUPPORTED_OPERATION: &str =
    "Unsupported operation. Use add, subtract, multiply, or divide.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BasicMathParameters {
    #[schemars(schema_with = "operation_schema")]
    operation: String,
    #[schemars(description = "The left operand.")]
    a: f64,
    #[schemars(description = "The right operand.")]
    b: f64,
}

// Unknown operations are answered by the tool itself, so the field stays a
// plain string and only the schema advertises the choices.
fn operation_schema(_: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "string",
        "enum": ["add", "subtract", "multiply", "divide"],
        "description": "The operation to perform.",
    })
}

/// Applies `operation` to `a` and `b`.
///
/// Never fails: division by zero and unknown operations produce a message.
pub fn basic_math(operation: &str, a: f64, b: f64) -> String {
    let (symbol, result) = match operation {
        "add" => ('+', a + b),
        "subtract" => ('-', a - b),
        "multiply" => ('*', a * b),
        "divide" if b == 0.0 => return DIVIDE_BY_ZERO.to_owned(),
        "divide" => ('/', a / b),
        _ => return UNSUPPORTED_OPERATION.to_owned(),
    };
    format!(
        "{} {symbol} {} = {}",
        format_number(a),
        format_number(b),
        format_number(result)
    )
}

/// A four-function calculator.
pub struct BasicMathTool {
    parameter_schema: Value,
}

impl BasicMathTool {
    /// Creates a new calculator tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(BasicMathParameters).to_value(),
        }
    }
}

impl Default for BasicMathTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for BasicMathTool {
    type Input = BasicMathParameters;

    fn name(&self) -> &str {
        "basic_math"
    }

    fn description(&self) -> &str {
        "Performs basic math operations: add, subtract, multiply, divide."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: BasicMathParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move { Ok(basic_math(&input.operation, input.a, input.b)) }
    }
}
