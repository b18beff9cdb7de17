use std::sync::{Arc, Mutex, PoisonError};

use intellibot_core::tool::{Tool, ToolResult};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use schemars::schema_for;
use serde_json::Value;

use super::NoParameters;

/// The jokes [`JokeTool`] picks from.
pub const JOKES: [&str; 3] = [
    "Why do programmers prefer dark mode? Because light attracts bugs!",
    "Why did the computer show up late to work? It had a hard drive.",
    "Why do Java developers wear glasses? Because they don't see sharp.",
];

/// The quotes [`QuoteTool`] picks from.
pub const QUOTES: [&str; 3] = [
    "Believe you can and you're halfway there. – Theodore Roosevelt",
    "Success is not final, failure is not fatal: It is the courage to continue that counts. – Winston Churchill",
    "What you do today can improve all your tomorrows. – Ralph Marston",
];

/// A shared random source for picking list entries.
///
/// Clones draw from the same generator.
#[derive(Clone)]
pub struct Picker {
    rng: Arc<Mutex<StdRng>>,
}

impl Picker {
    /// Creates a picker seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a picker with reproducible picks.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Picks one entry uniformly at random, with replacement.
    ///
    /// Returns an empty string for an empty list.
    pub fn pick(&self, items: &[&'static str]) -> &'static str {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        items.choose(&mut *rng).copied().unwrap_or_default()
    }
}

impl Default for Picker {
    #[inline]
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Tells a random programming joke.
pub struct JokeTool {
    picker: Picker,
    parameter_schema: Value,
}

impl JokeTool {
    /// Creates a joke tool drawing from `picker`.
    #[inline]
    pub fn new(picker: Picker) -> Self {
        Self {
            picker,
            parameter_schema: schema_for!(NoParameters).to_value(),
        }
    }
}

impl Tool for JokeTool {
    type Input = NoParameters;

    fn name(&self) -> &str {
        "joke_generator"
    }

    fn description(&self) -> &str {
        "Tells a random joke."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _input: NoParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let joke = self.picker.pick(&JOKES);
        async move { Ok(joke.to_owned()) }
    }
}

/// Shares a motivational quote.
pub struct QuoteTool {
    picker: Picker,
    parameter_schema: Value,
}

impl QuoteTool {
    /// Creates a quote tool drawing from `picker`.
    #[inline]
    pub fn new(picker: Picker) -> Self {
        Self {
            picker,
            parameter_schema: schema_for!(NoParameters).to_value(),
        }
    }
}

impl Tool for QuoteTool {
    type Input = NoParameters;

    fn name(&self) -> &str {
        "quote_of_the_day"
    }

    fn description(&self) -> &str {
        "Returns a motivational quote."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _input: NoParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let quote = self.picker.pick(&QUOTES);
        async move { Ok(quote.to_owned()) }
    }
}
