use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Broad classification of a model provider failure.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ErrorKind {
    /// The content is moderated.
    Moderated,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The credential was missing, wrong, or lacks access.
    Unauthorized,
    /// The backend could not be reached or failed on its side.
    Unavailable,
    /// Any other errors.
    Other,
}

impl ErrorKind {
    /// Returns `true` if sending the same request again may succeed.
    #[inline]
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::RateLimitExceeded | ErrorKind::Unavailable)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Moderated => "content moderated",
            ErrorKind::RateLimitExceeded => "rate limit exceeded",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Unavailable => "model backend unavailable",
            ErrorKind::Other => "model error",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(ErrorKind::RateLimitExceeded.is_transient());
        assert!(ErrorKind::Unavailable.is_transient());
        assert!(!ErrorKind::Unauthorized.is_transient());
        assert!(!ErrorKind::Moderated.is_transient());
        assert!(!ErrorKind::Other.is_transient());
    }
}
