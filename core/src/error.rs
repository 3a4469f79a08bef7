//! Error types for resource construction and execution.
//!
//! # Design
//! `NetworkingError` is the closed taxonomy every load resolves to: a caller
//! always gets either a typed value or one of these variants. Construction
//! problems (a base URL that does not parse, a body that cannot be encoded)
//! are a separate `BuildError` returned by the resource builders, so they
//! surface before any request is issued.

use crate::http::ResponseMetadata;

/// Boxed error carried by the `Generic` and `Parse` variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors delivered as the result of executing a `Resource`.
#[derive(Debug, thiserror::Error)]
pub enum NetworkingError {
    /// The response passed status checks but carried no body where one was required.
    #[error("response contained no data")]
    NoData,

    /// The status code was rejected by the resource's status predicate.
    #[error("unexpected HTTP status {status}")]
    Http {
        status: u16,
        response: ResponseMetadata,
    },

    /// Reserved for callers that want to single out 401 responses.
    #[error("unauthorized")]
    Unauthorized,

    /// The transport failed before a response was obtained.
    #[error("transport error: {0}")]
    Generic(#[source] BoxError),

    /// The transport produced neither an error nor response metadata.
    #[error("missing or malformed HTTP response")]
    Response,

    /// The body could not be parsed into the expected type.
    #[error("failed to parse response: {0}")]
    Parse(#[source] BoxError),
}

impl NetworkingError {
    /// Status code of a rejected response, if this is an `Http` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkingError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when a load was cancelled or its runtime shut down first.
    pub fn is_cancelled(&self) -> bool {
        match self {
            NetworkingError::Generic(source) => {
                matches!(source.downcast_ref::<Interrupted>(), Some(Interrupted::Cancelled))
            }
            _ => false,
        }
    }

    /// True for `Unauthorized` and for a rejected 401 response.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            NetworkingError::Unauthorized | NetworkingError::Http { status: 401, .. }
        )
    }
}

/// Why a load ended without a response, carried inside `Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    /// The load was cancelled, or dropped by a runtime shutting down.
    #[error("load cancelled")]
    Cancelled,

    /// `load` was called outside a tokio runtime.
    #[error("no tokio runtime available to run the load")]
    NoRuntime,
}

/// Errors raised while building a `Resource`.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),
}
