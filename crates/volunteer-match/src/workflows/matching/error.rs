use axum::http::StatusCode;
use serde::Serialize;

use super::directory::DirectoryError;
use super::domain::{ApplicationId, JobId, UserId};
use super::store::StoreError;

/// Coarse error classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Conflict,
    Validation,
    StorageFailure,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidState => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error raised by the lifecycle managers.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("job {0} is not open")]
    JobNotOpen(JobId),
    #[error("job {0} is not assigned to the given volunteer")]
    JobNotAssigned(JobId),
    #[error("job {0} has not been completed")]
    JobNotCompleted(JobId),
    #[error("job {0} is completed or cancelled and can no longer change")]
    JobFinalized(JobId),
    #[error("job {0} already has an accepted volunteer")]
    AlreadyAssigned(JobId),
    #[error("job {0} has already been rated")]
    AlreadyRated(JobId),
    #[error("job {0} has no accepted volunteer on record")]
    NoVolunteerAssigned(JobId),
    #[error("no pending application to cancel for job {0}")]
    CannotCancel(JobId),
    #[error("application {0} is no longer pending and cannot be rejected")]
    CannotReject(ApplicationId),
    #[error("application {0} is no longer pending and cannot be accepted")]
    CannotAccept(ApplicationId),
    #[error("volunteer already applied to job {0}")]
    AlreadyApplied(JobId),
    #[error("rating must be an integer between 1 and 5, got {0}")]
    InvalidRating(i64),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl MatchingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchingError::JobNotFound(_)
            | MatchingError::ApplicationNotFound(_)
            | MatchingError::UserNotFound(_) => ErrorKind::NotFound,
            MatchingError::JobNotOpen(_)
            | MatchingError::JobNotAssigned(_)
            | MatchingError::JobNotCompleted(_)
            | MatchingError::JobFinalized(_)
            | MatchingError::AlreadyAssigned(_)
            | MatchingError::AlreadyRated(_)
            | MatchingError::NoVolunteerAssigned(_)
            | MatchingError::CannotCancel(_)
            | MatchingError::CannotReject(_)
            | MatchingError::CannotAccept(_) => ErrorKind::InvalidState,
            MatchingError::AlreadyApplied(_) => ErrorKind::Conflict,
            MatchingError::InvalidRating(_) => ErrorKind::Validation,
            MatchingError::Directory(_) | MatchingError::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            MatchingError::JobNotFound(_) => "job_not_found",
            MatchingError::ApplicationNotFound(_) => "application_not_found",
            MatchingError::UserNotFound(_) => "user_not_found",
            MatchingError::JobNotOpen(_) => "job_not_open",
            MatchingError::JobNotAssigned(_) => "job_not_assigned",
            MatchingError::JobNotCompleted(_) => "job_not_completed",
            MatchingError::JobFinalized(_) => "job_finalized",
            MatchingError::AlreadyAssigned(_) => "already_assigned",
            MatchingError::AlreadyRated(_) => "already_rated",
            MatchingError::NoVolunteerAssigned(_) => "no_volunteer_assigned",
            MatchingError::CannotCancel(_) => "cannot_cancel",
            MatchingError::CannotReject(_) => "cannot_reject",
            MatchingError::CannotAccept(_) => "cannot_accept",
            MatchingError::AlreadyApplied(_) => "already_applied",
            MatchingError::InvalidRating(_) => "invalid_rating",
            MatchingError::Directory(_) | MatchingError::Storage(_) => "storage_failure",
        }
    }

    /// Caller-facing message; storage failures never leak their details.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::StorageFailure => "storage temporarily unavailable, retry later".to_string(),
            _ => self.to_string(),
        }
    }
}
