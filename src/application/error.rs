//! The application error taxonomy.
//!
//! Every failure in the prerender core is per-operation; nothing here is
//! allowed to take the host process down.

use thiserror::Error;

use crate::application::dispatcher::TransportError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum PrerenderError {
    /// Unknown type, malformed id, unparseable date. Never retried.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Secret missing, expired or mismatched. The renderer must be
    /// re-triggered by a fresh schedule.
    #[error("authorization rejected: {message}")]
    Authorization { message: String },

    /// Entry/secret/version persistence failure. Dependent steps abort.
    #[error(transparent)]
    Storage(#[from] RepoError),

    /// The render transport refused the invocation. Surfaced to the caller;
    /// never retried here.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PrerenderError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }
}

impl From<DomainError> for PrerenderError {
    fn from(err: DomainError) -> Self {
        Self::validation(err.to_string())
    }
}
