use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::directory::UserDirectory;
use super::domain::{Job, JobId, JobPatch, JobStatus, NewJob, UserId};
use super::error::MatchingError;
use super::store::{EntityStore, StoreTransaction};

/// Owns job status transitions and the binding of the accepted volunteer.
pub struct JobLifecycle<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
}

impl<S, D> JobLifecycle<S, D>
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>) -> Self {
        Self { store, directory }
    }

    /// Post a new open job for an existing requester.
    pub fn create(&self, requester_id: &UserId, attrs: NewJob) -> Result<Job, MatchingError> {
        if !self.directory.exists(requester_id)? {
            return Err(MatchingError::UserNotFound(requester_id.clone()));
        }
        let contact = self
            .directory
            .profile(requester_id)?
            .map(|profile| profile.contact())
            .unwrap_or_default();

        let job = Job::open(requester_id.clone(), contact, attrs, Utc::now());
        self.store.transaction(|tx| {
            tx.insert_job(job.clone())?;
            Ok::<_, MatchingError>(())
        })?;

        info!(job_id = %job.id, requester_id = %requester_id, "job posted");
        Ok(job)
    }

    pub fn get(&self, job_id: &JobId) -> Result<Job, MatchingError> {
        self.store.transaction(|tx| load(tx, job_id))
    }

    /// Every job, newest first.
    pub fn list(&self) -> Result<Vec<Job>, MatchingError> {
        let jobs = self.store.transaction(|tx| tx.jobs())?;
        Ok(newest_first(jobs))
    }

    pub fn list_for_requester(&self, requester_id: &UserId) -> Result<Vec<Job>, MatchingError> {
        let jobs = self.store.transaction(|tx| tx.jobs())?;
        Ok(newest_first(
            jobs.into_iter()
                .filter(|job| &job.requester_id == requester_id)
                .collect(),
        ))
    }

    /// Edit descriptive fields while the job is still live.
    pub fn update(&self, job_id: &JobId, patch: JobPatch) -> Result<Job, MatchingError> {
        let job = self.store.transaction(|tx| {
            let mut job = load(tx, job_id)?;
            if job.status.is_final() {
                return Err(MatchingError::JobFinalized(job_id.clone()));
            }
            job.apply_patch(patch.clone(), Utc::now());
            tx.update_job(job.clone())?;
            Ok(job)
        })?;

        info!(job_id = %job.id, "job details updated");
        Ok(job)
    }

    /// Mark an assigned job done by its bound volunteer and credit them one completion.
    pub fn complete(&self, job_id: &JobId, volunteer_id: &UserId) -> Result<Job, MatchingError> {
        let job = self.store.transaction(|tx| {
            let mut job = load(tx, job_id)?;
            if job.status != JobStatus::Assigned || !job.is_assigned_to(volunteer_id) {
                return Err(MatchingError::JobNotAssigned(job_id.clone()));
            }

            let now = Utc::now();
            job.status = JobStatus::Completed;
            job.updated_at = now;
            tx.update_job(job.clone())?;

            if let Some(mut application) = tx.application_for(job_id, volunteer_id)? {
                application.updated_at = now;
                tx.update_application(application)?;
            }

            let mut stats = tx.volunteer_stats(volunteer_id)?;
            stats.completed_jobs += 1;
            tx.put_volunteer_stats(stats)?;
            Ok(job)
        })?;

        info!(job_id = %job.id, volunteer_id = %volunteer_id, "job completed");
        Ok(job)
    }

    /// Withdraw a job nobody has been accepted for yet.
    pub fn cancel(&self, job_id: &JobId) -> Result<Job, MatchingError> {
        let job = self.store.transaction(|tx| {
            let mut job = load(tx, job_id)?;
            if !job.accepts_applications() {
                return Err(MatchingError::JobNotOpen(job_id.clone()));
            }
            job.status = JobStatus::Cancelled;
            job.updated_at = Utc::now();
            tx.update_job(job.clone())?;
            Ok(job)
        })?;

        info!(job_id = %job.id, "job cancelled");
        Ok(job)
    }
}

/// Bind the accepted volunteer to an open job inside the caller's transaction.
///
/// Only application acceptance calls this; exclusivity is re-checked here regardless.
pub(crate) fn bind_volunteer(
    tx: &mut dyn StoreTransaction,
    job_id: &JobId,
    volunteer_id: &UserId,
    now: DateTime<Utc>,
) -> Result<Job, MatchingError> {
    let mut job = load(tx, job_id)?;
    if job.accepted_volunteer_id.is_some() {
        return Err(MatchingError::AlreadyAssigned(job_id.clone()));
    }
    if job.status != JobStatus::Open {
        return Err(MatchingError::JobNotOpen(job_id.clone()));
    }

    job.status = JobStatus::Assigned;
    job.accepted_volunteer_id = Some(volunteer_id.clone());
    job.updated_at = now;
    tx.update_job(job.clone())?;
    Ok(job)
}

pub(crate) fn load(tx: &mut dyn StoreTransaction, job_id: &JobId) -> Result<Job, MatchingError> {
    tx.job(job_id)?
        .ok_or_else(|| MatchingError::JobNotFound(job_id.clone()))
}

fn newest_first(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.reverse();
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    jobs
}
