use std::error::Error as StdError;
use std::fmt::{self, Display};

use intellibot_model::{ErrorKind, ModelProviderError};

/// Why a turn could not be completed.
#[derive(Debug)]
pub enum Error {
    /// The model provider failed, after any retries.
    Model(Box<dyn ModelProviderError>),
    /// The model kept asking for tools for this many steps.
    StepLimitExceeded(usize),
}

impl Error {
    /// Returns the provider error kind, if the provider failed.
    #[inline]
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Model(err) => Some(err.kind()),
            Error::StepLimitExceeded(_) => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Model(err) => write!(f, "model request failed: {err}"),
            Error::StepLimitExceeded(steps) => write!(
                f,
                "no final answer after {steps} model steps, giving up"
            ),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Model(err) => Some(err.as_ref()),
            Error::StepLimitExceeded(_) => None,
        }
    }
}
