use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Broad classification of a provider failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The provider refused the content.
    Moderated,
    /// Too many requests were sent to the provider.
    RateLimitExceeded,
    /// The credentials were rejected.
    Unauthorized,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Moderated => write!(f, "content moderated"),
            ErrorKind::RateLimitExceeded => write!(f, "rate limit exceeded"),
            ErrorKind::Unauthorized => write!(f, "unauthorized"),
            ErrorKind::Other => write!(f, "provider error"),
        }
    }
}
