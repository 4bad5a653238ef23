use std::error::Error as StdError;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced by index lifecycle and egress operations.
///
/// The kinds are never folded into one another: a rejected egress target stays
/// a `Validation` even when it is raised from deep inside the HTTP stack.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unreadable bundled template, disallowed scheme, bad config.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Egress target refused (private address, invalid port) or unusable input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Embedding model returned no usable output.
    #[error("model invocation error: {0}")]
    Invocation(String),

    /// Cluster or HTTP transport failure, passed through as-is.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
}

impl Error {
    pub fn cluster_status(status: u16, body: &str) -> Self {
        Error::Transport(format!("cluster responded with status {}: {}", status, body).into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_invocation(&self) -> bool {
        matches!(self, Error::Invocation(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

/// Looks for an egress rejection raised by the guarded resolver somewhere in
/// the source chain of a reqwest error.
pub(crate) fn rejection_in_chain(err: &reqwest::Error) -> Option<Error> {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(found) = cause.downcast_ref::<Error>() {
            match found {
                Error::Validation(msg) => {
                    return Some(Error::Validation(msg.clone()));
                }
                Error::Configuration(msg) => {
                    return Some(Error::Configuration(msg.clone()));
                }
                _ => {}
            }
        }
        source = cause.source();
    }
    None
}
