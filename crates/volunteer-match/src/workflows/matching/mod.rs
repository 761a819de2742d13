//! Volunteer job matching: posting jobs, applying, accepting one volunteer, completion, and
//! requester ratings.
//!
//! The three lifecycle managers ([`JobLifecycle`], [`ApplicationLifecycle`],
//! [`RatingAggregator`]) share no state with each other; each operation runs as one
//! transaction against an [`EntityStore`].

pub mod applications;
pub mod directory;
pub mod domain;
pub mod error;
pub mod jobs;
pub mod ratings;
pub mod router;
pub mod service;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

pub use applications::ApplicationLifecycle;
pub use directory::{DirectoryError, UserDirectory, UserProfile, UserRole};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, ContactInfo, Job, JobId, JobPatch, JobStatus,
    Location, NewJob, Rating, Requirements, Schedule, UserId, VolunteerStats,
};
pub use error::{ErrorKind, MatchingError};
pub use jobs::JobLifecycle;
pub use ratings::{running_average, RatingAggregator, RatingOutcome};
pub use router::matching_router;
pub use service::MatchingService;
pub use store::{
    EntityKind, EntityStore, InMemoryStore, StoreError, StoreTransaction, UniqueKey,
};
pub use views::{
    JobApplicationView, JobSummary, JobView, ReviewView, VolunteerApplicationView,
    VolunteerProfileView,
};
