use std::error::Error as StdError;
use std::fmt::{self, Display};

use recruit_agent_model::{ErrorKind, ModelProviderError};

/// An error that aborts a run.
///
/// Tool failures never end up here, they are reported to the model as
/// tool results instead.
#[derive(Debug)]
pub enum Error {
    /// The model provider failed to produce a response.
    Model(Box<dyn ModelProviderError>),
    /// The model kept requesting tools for more turns than allowed.
    TurnLimitExceeded {
        /// The number of model turns that were allowed.
        limit: usize,
    },
}

impl Error {
    /// Returns the provider error kind, if the model request failed.
    #[inline]
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Model(err) => Some(err.kind()),
            Error::TurnLimitExceeded { .. } => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Model(err) => write!(f, "model request failed: {err}"),
            Error::TurnLimitExceeded { limit } => {
                write!(f, "model still requested tools after {limit} turns")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Model(err) => Some(err.as_ref()),
            Error::TurnLimitExceeded { .. } => None,
        }
    }
}
