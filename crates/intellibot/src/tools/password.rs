use intellibot_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

const SYMBOLS: &[char] = &['!', '@', '#', '$', '%', '^', '&', '*'];

/// How hard a password would be to guess.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StrengthTier {
    /// Short or drawn from too few character classes.
    Weak,
    /// At least 8 characters from 3 or more classes.
    Moderate,
    /// At least 12 characters from all 4 classes.
    Strong,
}

impl StrengthTier {
    /// Classifies `password`.
    ///
    /// The classes are ASCII uppercase, ASCII lowercase, ASCII digits and the
    /// symbols `!@#$%^&*`. Length counts characters, not bytes.
    pub fn classify(password: &str) -> Self {
        let length = password.chars().count();
        let classes = [
            password.chars().any(|c| c.is_ascii_uppercase()),
            password.chars().any(|c| c.is_ascii_lowercase()),
            password.chars().any(|c| c.is_ascii_digit()),
            password.contains(SYMBOLS),
        ]
        .into_iter()
        .filter(|&present| present)
        .count();

        if length >= 12 && classes == 4 {
            StrengthTier::Strong
        } else if length >= 8 && classes >= 3 {
            StrengthTier::Moderate
        } else {
            StrengthTier::Weak
        }
    }

    /// Returns the verdict shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            StrengthTier::Strong => "✅ Strong password.",
            StrengthTier::Moderate => {
                "🟡 Moderate password. Consider adding more symbols or uppercase letters."
            }
            StrengthTier::Weak => {
                "🔴 Weak password. Use 12+ characters, mix upper/lowercase, numbers & symbols."
            }
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PasswordStrengthParameters {
    #[schemars(description = "The password to evaluate.")]
    password: String,
}

/// Rates a password and suggests improvements.
pub struct PasswordStrengthTool {
    parameter_schema: Value,
}

impl PasswordStrengthTool {
    /// Creates a new password strength tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(PasswordStrengthParameters)
                .to_value(),
        }
    }
}

impl Default for PasswordStrengthTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for PasswordStrengthTool {
    type Input = PasswordStrengthParameters;

    fn name(&self) -> &str {
        "password_strength"
    }

    fn description(&self) -> &str {
        "Evaluates the strength of a password and offers tips."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: PasswordStrengthParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let tier = StrengthTier::classify(&input.password);
        async move { Ok(tier.message().to_owned()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert_eq!(StrengthTier::classify("Aa1!Aa1!Aa1!"), StrengthTier::Strong);
        assert_eq!(StrengthTier::classify("password"), StrengthTier::Weak);
        assert_eq!(StrengthTier::classify("Password1"), StrengthTier::Moderate);
        assert_eq!(StrengthTier::classify(""), StrengthTier::Weak);
    }

    #[test]
    fn test_thresholds() {
        // Long with only three classes is not strong.
        assert_eq!(
            StrengthTier::classify("Password1234"),
            StrengthTier::Moderate
        );
        // All four classes but too short to be strong.
        assert_eq!(StrengthTier::classify("Aa1!Aa1!"), StrengthTier::Moderate);
        assert_eq!(StrengthTier::classify("Aa1!Aa1"), StrengthTier::Weak);
        // Symbols outside the set do not count.
        assert_eq!(StrengthTier::classify("aaaa1111----"), StrengthTier::Weak);
        assert_eq!(StrengthTier::classify("Aa1-Aa1-Aa1-"), StrengthTier::Moderate);
    }

    #[test]
    fn test_length_counts_characters() {
        // Twelve characters, more than twelve bytes.
        assert_eq!(StrengthTier::classify("Aa1!éééééééé"), StrengthTier::Strong);
        // Non-ASCII letters are not an uppercase or lowercase class.
        assert_eq!(StrengthTier::classify("ÄÖÜäöü123!!!"), StrengthTier::Weak);
    }

    #[tokio::test]
    async fn test_tool() {
        let tool = PasswordStrengthTool::new();
        let input = PasswordStrengthParameters {
            password: "hunter2".to_owned(),
        };
        assert_eq!(
            tool.execute(input).await.unwrap(),
            "🔴 Weak password. Use 12+ characters, mix upper/lowercase, numbers & symbols."
        );
    }
}
