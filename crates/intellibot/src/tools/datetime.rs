use std::sync::Arc;

use chrono::NaiveDate;
use intellibot_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::NoParameters;
use crate::clock::{Clock, SystemClock};

const DATE_FORMAT: &str = "%Y-%m-%d";
const BAD_DATE_FORMAT: &str = "Please use date format YYYY-MM-DD.";

/// Formats the current local time of `clock`.
pub fn current_datetime(clock: &dyn Clock) -> String {
    clock
        .now()
        .format("Current date and time: %Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Parses a date whose year is exactly four ASCII digits.
///
/// `%Y` alone also takes signed years of any width and leading whitespace.
fn parse_date(date: &str) -> Option<NaiveDate> {
    let [year @ .., b'-'] = date.as_bytes().get(..5)? else {
        return None;
    };
    if !year.iter().all(u8::is_ascii_digit) {
        return None;
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// Counts the days between two `YYYY-MM-DD` dates, in either order.
pub fn days_between(start_date: &str, end_date: &str) -> String {
    match (parse_date(start_date), parse_date(end_date)) {
        (Some(start), Some(end)) => format!(
            "There are {} days between {start_date} and {end_date}.",
            (end - start).num_days().abs()
        ),
        _ => {
            debug!("rejecting date range {start_date:?}..{end_date:?}");
            BAD_DATE_FORMAT.to_owned()
        }
    }
}

/// Reports the current date and time.
pub struct CurrentDateTimeTool {
    clock: Arc<dyn Clock>,
    parameter_schema: Value,
}

impl CurrentDateTimeTool {
    /// Creates a tool that reads the system clock.
    #[inline]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a tool that reads `clock`.
    #[inline]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            parameter_schema: schema_for!(NoParameters).to_value(),
        }
    }
}

impl Default for CurrentDateTimeTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CurrentDateTimeTool {
    type Input = NoParameters;

    fn name(&self) -> &str {
        "current_datetime"
    }

    fn description(&self) -> &str {
        "Returns the current date and time."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _input: NoParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        // Read the clock when the call is made, not when it is polled.
        let output = current_datetime(self.clock.as_ref());
        async move { Ok(output) }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DaysBetweenParameters {
    #[schemars(description = "The first date, as YYYY-MM-DD.")]
    start_date: String,
    #[schemars(description = "The second date, as YYYY-MM-DD.")]
    end_date: String,
}

/// Counts the days between two dates.
pub struct DaysBetweenTool {
    parameter_schema: Value,
}

impl DaysBetweenTool {
    /// Creates a new date span tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(DaysBetweenParameters).to_value(),
        }
    }
}

impl Default for DaysBetweenTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for DaysBetweenTool {
    type Input = DaysBetweenParameters;

    fn name(&self) -> &str {
        "days_between"
    }

    fn description(&self) -> &str {
        "Calculates the number of days between two dates. Format: YYYY-MM-DD"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: DaysBetweenParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move { Ok(days_between(&input.start_date, &input.end_date)) }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::clock::FixedClock;

    fn fixed_clock() -> Arc<dyn Clock> {
        let now = NaiveDateTime::parse_from_str(
            "2024-03-09 07:05:03",
            "%Y-%m-%d %H:%M:%S",
        )
        .unwrap();
        Arc::new(FixedClock::new(now))
    }

    #[tokio::test]
    async fn test_current_datetime() {
        let tool = CurrentDateTimeTool::with_clock(fixed_clock());
        assert_eq!(
            tool.execute(NoParameters {}).await.unwrap(),
            "Current date and time: 2024-03-09 07:05:03"
        );
    }

    #[test]
    fn test_system_clock_format() {
        let output = current_datetime(&SystemClock);
        let stamp = output.strip_prefix("Current date and time: ").unwrap();
        assert!(NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[test]
    fn test_days_between() {
        assert_eq!(
            days_between("2024-01-01", "2024-01-10"),
            "There are 9 days between 2024-01-01 and 2024-01-10."
        );
        assert_eq!(
            days_between("2024-01-10", "2024-01-01"),
            "There are 9 days between 2024-01-10 and 2024-01-01."
        );
        assert_eq!(
            days_between("2024-02-28", "2024-03-01"),
            "There are 2 days between 2024-02-28 and 2024-03-01."
        );
        assert_eq!(
            days_between("2024-05-05", "2024-05-05"),
            "There are 0 days between 2024-05-05 and 2024-05-05."
        );
    }

    #[test]
    fn test_days_between_is_symmetric() {
        let dates = ["1999-12-31", "2000-02-29", "2024-01-01", "2031-07-15"];
        for a in dates {
            for b in dates {
                let forward = days_between(a, b);
                let backward = days_between(b, a);
                let count = |s: &str| s.split(' ').nth(2).unwrap().to_owned();
                assert_eq!(count(&forward), count(&backward));
            }
        }
    }

    #[test]
    fn test_malformed_dates() {
        for (start, end) in [
            ("2024-13-01", "2024-01-01"),
            ("2024-01-01", "2023-02-29"),
            ("01/02/2024", "2024-01-01"),
            ("2024-01-01", "tomorrow"),
            ("", ""),
            ("24-01-01", "2024-01-10"),
            (" 2024-01-01", "2024-01-10"),
            ("+2024-01-01", "2024-01-10"),
            ("2024-01-01", "12024-01-10"),
        ] {
            assert_eq!(days_between(start, end), BAD_DATE_FORMAT);
        }
    }

    #[test]
    fn test_unpadded_month_and_day() {
        assert_eq!(
            days_between("2024-1-1", "2024-01-10"),
            "There are 9 days between 2024-1-1 and 2024-01-10."
        );
    }

    #[tokio::test]
    async fn test_days_between_tool() {
        let tool = DaysBetweenTool::new();
        let input: DaysBetweenParameters = serde_json::from_value(
            serde_json::json!({ "start_date": "2024-12-25", "end_date": "2025-01-01" }),
        )
        .unwrap();
        assert_eq!(
            tool.execute(input).await.unwrap(),
            "There are 7 days between 2024-12-25 and 2025-01-01."
        );
    }
}
