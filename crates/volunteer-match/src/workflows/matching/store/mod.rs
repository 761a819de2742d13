//! Entity store contract shared by the lifecycle managers.
//!
//! Managers never cache entities between calls: every operation opens a transaction through
//! [`EntityStore::transaction`], re-reads what it needs through [`StoreTransaction`], and
//! writes back inside the same closure. Either every staged write becomes visible or none does.

mod memory;
mod snapshot;

use std::fmt;

use super::domain::{Application, ApplicationId, Job, JobId, UserId, VolunteerStats};

pub use memory::InMemoryStore;

/// Record families held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Job,
    Application,
    Volunteer,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Job => "job",
            EntityKind::Application => "application",
            EntityKind::Volunteer => "volunteer",
        };
        f.write_str(label)
    }
}

/// Uniqueness constraints enforced on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueKey {
    JobId,
    ApplicationId,
    /// At most one application per (job, volunteer) pair.
    JobVolunteer,
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UniqueKey::JobId => "jobs.id",
            UniqueKey::ApplicationId => "applications.id",
            UniqueKey::JobVolunteer => "applications.job_id+volunteer_id",
        };
        f.write_str(label)
    }
}

/// Storage-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("duplicate key violates unique constraint {0}")]
    DuplicateKey(UniqueKey),
    #[error("transaction abandoned after {attempts} attempts due to concurrent writes")]
    Contention { attempts: u32 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Row-level view handed to a transaction closure.
///
/// Reads observe the transaction's own staged writes. Listing methods return rows in
/// insertion order; callers impose their own presentation order.
pub trait StoreTransaction {
    fn job(&mut self, id: &JobId) -> Result<Option<Job>, StoreError>;
    fn jobs(&mut self) -> Result<Vec<Job>, StoreError>;
    fn insert_job(&mut self, job: Job) -> Result<(), StoreError>;
    fn update_job(&mut self, job: Job) -> Result<(), StoreError>;

    fn application(&mut self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    fn applications_for_job(&mut self, job_id: &JobId) -> Result<Vec<Application>, StoreError>;
    fn applications_for_volunteer(
        &mut self,
        volunteer_id: &UserId,
    ) -> Result<Vec<Application>, StoreError>;
    fn insert_application(&mut self, application: Application) -> Result<(), StoreError>;
    fn update_application(&mut self, application: Application) -> Result<(), StoreError>;
    fn delete_application(&mut self, id: &ApplicationId) -> Result<(), StoreError>;

    /// Rating projection; volunteers without a row read as zero stats.
    fn volunteer_stats(&mut self, volunteer_id: &UserId) -> Result<VolunteerStats, StoreError>;
    fn put_volunteer_stats(&mut self, stats: VolunteerStats) -> Result<(), StoreError>;

    fn application_for(
        &mut self,
        job_id: &JobId,
        volunteer_id: &UserId,
    ) -> Result<Option<Application>, StoreError> {
        Ok(self
            .applications_for_job(job_id)?
            .into_iter()
            .find(|application| &application.volunteer_id == volunteer_id))
    }
}

/// Transactional storage abstraction so the lifecycle managers can be exercised in isolation.
pub trait EntityStore: Send + Sync {
    /// Run `work` with all-or-nothing semantics.
    ///
    /// The closure may be invoked more than once when a concurrent commit invalidates what it
    /// read, so it must not have side effects outside the transaction.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<StoreError>;

    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        self.transaction(|tx| tx.job(id))
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        self.transaction(|tx| tx.application(id))
    }
}
