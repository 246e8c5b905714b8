use crate::redirect::AttemptState;

/// Errors produced while resolving or fetching an article.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("article not found")]
    NotFound,

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ResolveError {
    /// Malformed responses are indistinguishable from missing articles to callers.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound | ResolveError::Malformed(_))
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ResolveError::Malformed(err.to_string())
        } else {
            ResolveError::Network(err.to_string())
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RedirectError {
    #[error("a redirect from {from} to {to} was already issued for this attempt")]
    LoopPrevented { from: String, to: String },

    #[error("invalid attempt transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: AttemptState,
        to: AttemptState,
    },
}
