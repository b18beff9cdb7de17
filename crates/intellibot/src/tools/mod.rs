//! The tools the assistant can call.

mod datetime;
mod math;
mod password;
mod picks;
mod units;

pub use datetime::{CurrentDateTimeTool, DaysBetweenTool};
pub use math::BasicMathTool;
pub use password::{PasswordStrengthTool, StrengthTier};
pub use picks::{JOKES, JokeTool, Picker, QUOTES, QuoteTool};
pub use units::UnitConverterTool;

use schemars::JsonSchema;
use serde::Deserialize;

/// Input of tools that take no arguments.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoParameters {}

/// Renders a number in its shortest round-trip form.
///
/// The output always has a fractional part or an exponent, and exponents
/// carry a sign and at least two digits: `2.0`, `1e+16`, `1.5e-05`.
pub(crate) fn format_number(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_owned();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_owned();
    }

    // `Debug` switches to scientific notation at the same thresholds.
    let repr = format!("{x:?}");
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => repr,
    }
}
