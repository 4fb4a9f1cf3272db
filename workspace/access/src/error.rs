use thiserror::Error;

/// Error taxonomy for access-control operations.
///
/// Validation and duplicate errors are recoverable by the caller and carry
/// enough detail to correct the input. Authorization failures stay generic
/// so they reveal nothing about whether the underlying resource exists.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Missing or malformed input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The username is already taken by another account.
    #[error("username is already taken")]
    DuplicateUsername,

    /// The account already has a PENDING elevation request.
    #[error("an elevation request is already pending for this account")]
    DuplicatePending,

    /// Unknown username or wrong password; the two are indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The caller lacks the required role, or presented no valid session.
    #[error("access denied")]
    Unauthorized,

    /// Mutation attempt against a protected entity (the seed admin).
    #[error("operation is not permitted on a protected account")]
    ForbiddenOperation,

    /// The resource does not exist, or is no longer in a state that allows
    /// the operation.
    #[error("not found")]
    NotFound,

    /// The backing store did not answer within the configured bound; no
    /// local state was mutated speculatively.
    #[error("operation timed out")]
    Timeout,

    /// A multi-step operation was partially applied. The persisted state
    /// has been re-fetched; callers must refresh their view.
    #[error("state may be inconsistent, refresh required: {0}")]
    PartialFailure(String),

    /// Any other failure of the persistence backend.
    #[error("storage error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, AccessError>;

impl From<sea_orm::DbErr> for AccessError {
    fn from(err: sea_orm::DbErr) -> Self {
        AccessError::Store(err.to_string())
    }
}
