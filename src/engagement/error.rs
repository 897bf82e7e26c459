use thiserror::Error;

/// The error taxonomy every engagement operation surfaces.
///
/// `NotFound` deliberately covers both "does not exist" and "exists but the
/// caller is not the owner" for ownership-gated playlist mutations; the two
/// reasons are distinguished only in logs, never to the caller.
#[derive(Debug, Error)]
pub enum EngagementError {
    /// Malformed or missing input: identifier not well-formed, required
    /// field empty, out-of-range page parameters.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Entity exists, caller identified, but lacks rights. Only used where
    /// distinguishing from NotFound is intentional (comment mutations).
    #[error("{0}")]
    Forbidden(String),

    /// Duplicate membership, e.g. re-adding a video already in a playlist.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl EngagementError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        EngagementError::Validation(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        EngagementError::NotFound(msg.into())
    }

    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        EngagementError::Forbidden(msg.into())
    }

    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        EngagementError::Conflict(msg.into())
    }
}

pub type EngagementResult<T> = Result<T, EngagementError>;
