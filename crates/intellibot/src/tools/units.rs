use intellibot_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::format_number;

const NOT_SUPPORTED: &str = "Conversion not supported.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
    Inch,
    Centimeter,
    Pound,
    Kilogram,
    Mile,
    Kilometer,
    Celsius,
    Fahrenheit,
}

impl Unit {
    fn parse(name: &str) -> Option<Self> {
        let unit = match name.trim().to_lowercase().as_str() {
            "inch" | "inches" | "in" => Unit::Inch,
            "cm" | "centimeter" | "centimeters" | "centimetre"
            | "centimetres" => Unit::Centimeter,
            "lb" | "lbs" | "pound" | "pounds" => Unit::Pound,
            "kg" | "kgs" | "kilogram" | "kilograms" => Unit::Kilogram,
            "mile" | "miles" | "mi" => Unit::Mile,
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => {
                Unit::Kilometer
            }
            "c" | "°c" | "celsius" => Unit::Celsius,
            "f" | "°f" | "fahrenheit" => Unit::Fahrenheit,
            _ => return None,
        };
        Some(unit)
    }
}

static CONVERSIONS: [(Unit, Unit, fn(f64) -> f64); 8] = [
    (Unit::Inch, Unit::Centimeter, |x| x * 2.54),
    (Unit::Centimeter, Unit::Inch, |x| x / 2.54),
    (Unit::Pound, Unit::Kilogram, |x| x * 0.453592),
    (Unit::Kilogram, Unit::Pound, |x| x / 0.453592),
    (Unit::Mile, Unit::Kilometer, |x| x * 1.60934),
    (Unit::Kilometer, Unit::Mile, |x| x / 1.60934),
    (Unit::Celsius, Unit::Fahrenheit, |x| x * 9.0 / 5.0 + 32.0),
    (Unit::Fahrenheit, Unit::Celsius, |x| (x - 32.0) * 5.0 / 9.0),
];

fn lookup(from: Unit, to: Unit) -> Option<fn(f64) -> f64> {
    CONVERSIONS
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, convert)| *convert)
}

/// Rounds to two decimal places.
fn round2(x: f64) -> f64 {
    format!("{x:.2}").parse().unwrap_or(x)
}

/// Converts `value` from `unit_from` to `unit_to`.
///
/// Unit names are matched case-insensitively and echoed back as given.
pub fn convert(unit_from: &str, unit_to: &str, value: f64) -> String {
    let convert = Unit::parse(unit_from)
        .zip(Unit::parse(unit_to))
        .and_then(|(from, to)| lookup(from, to));
    let Some(convert) = convert else {
        return NOT_SUPPORTED.to_owned();
    };
    format!(
        "{} {unit_from} is {} {unit_to}",
        format_number(value),
        format_number(round2(convert(value)))
    )
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UnitConverterParameters {
    #[schemars(description = "The unit to convert from, e.g. `inch`.")]
    unit_from: String,
    #[schemars(description = "The unit to convert to, e.g. `cm`.")]
    unit_to: String,
    #[schemars(description = "The value to convert.")]
    value: f64,
}

/// Converts lengths, weights and temperatures.
pub struct UnitConverterTool {
    parameter_schema: Value,
}

impl UnitConverterTool {
    /// Creates a new unit converter tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(UnitConverterParameters).to_value(),
        }
    }
}

impl Default for UnitConverterTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for UnitConverterTool {
    type Input = UnitConverterParameters;

    fn name(&self) -> &str {
        "unit_converter"
    }

    fn description(&self) -> &str {
        "Converts between common SI and imperial units: inches<->cm, lbs<->kg, miles<->km, Fahrenheit<->Celsius."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: UnitConverterParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move { Ok(convert(&input.unit_from, &input.unit_to, input.value)) }
    }
}
