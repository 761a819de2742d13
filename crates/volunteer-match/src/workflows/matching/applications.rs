use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{Application, ApplicationId, ApplicationStatus, JobId, JobStatus, UserId};
use super::error::MatchingError;
use super::jobs;
use super::store::{EntityStore, StoreError, UniqueKey};

/// Owns application creation, decisions, and withdrawal.
pub struct ApplicationLifecycle<S> {
    store: Arc<S>,
}

impl<S> ApplicationLifecycle<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record a pending application from `volunteer_id` on an open job.
    pub fn apply(
        &self,
        job_id: &JobId,
        volunteer_id: &UserId,
    ) -> Result<Application, MatchingError> {
        let application = self
            .store
            .transaction(|tx| {
                let job = jobs::load(tx, job_id)?;
                if !job.accepts_applications() {
                    return Err(MatchingError::JobNotOpen(job_id.clone()));
                }
                let application =
                    Application::pending(job_id.clone(), volunteer_id.clone(), Utc::now());
                tx.insert_application(application.clone())?;
                Ok(application)
            })
            .map_err(|err| match err {
                MatchingError::Storage(StoreError::DuplicateKey(UniqueKey::JobVolunteer)) => {
                    MatchingError::AlreadyApplied(job_id.clone())
                }
                other => other,
            })?;

        info!(
            application_id = %application.id,
            job_id = %job_id,
            volunteer_id = %volunteer_id,
            "application submitted"
        );
        Ok(application)
    }

    /// Withdraw the volunteer's own application while it is still pending.
    pub fn cancel(&self, job_id: &JobId, volunteer_id: &UserId) -> Result<(), MatchingError> {
        let withdrawn = self.store.transaction(|tx| {
            let application = tx
                .application_for(job_id, volunteer_id)?
                .filter(|application| application.status == ApplicationStatus::Pending)
                .ok_or_else(|| MatchingError::CannotCancel(job_id.clone()))?;
            tx.delete_application(&application.id)?;
            Ok::<_, MatchingError>(application.id)
        })?;

        info!(application_id = %withdrawn, job_id = %job_id, volunteer_id = %volunteer_id, "application withdrawn");
        Ok(())
    }

    /// Accept one application: reject its pending siblings and bind the volunteer, atomically.
    pub fn accept(&self, application_id: &ApplicationId) -> Result<Application, MatchingError> {
        let (accepted, rejected) = self.store.transaction(|tx| {
            let mut application = tx
                .application(application_id)?
                .ok_or_else(|| MatchingError::ApplicationNotFound(application_id.clone()))?;

            let job = jobs::load(tx, &application.job_id)?;
            if job.accepted_volunteer_id.is_some() {
                return Err(MatchingError::AlreadyAssigned(job.id));
            }
            if job.status != JobStatus::Open {
                return Err(MatchingError::JobNotOpen(job.id));
            }
            if application.status != ApplicationStatus::Pending {
                return Err(MatchingError::CannotAccept(application_id.clone()));
            }

            let now = Utc::now();
            application.transition(ApplicationStatus::Accepted, now);
            tx.update_application(application.clone())?;

            let mut rejected = 0usize;
            for mut sibling in tx.applications_for_job(&application.job_id)? {
                if sibling.id == application.id || sibling.status != ApplicationStatus::Pending {
                    continue;
                }
                sibling.transition(ApplicationStatus::Rejected, now);
                tx.update_application(sibling)?;
                rejected += 1;
            }

            jobs::bind_volunteer(tx, &application.job_id, &application.volunteer_id, now)?;
            Ok((application, rejected))
        })?;

        info!(
            application_id = %accepted.id,
            job_id = %accepted.job_id,
            volunteer_id = %accepted.volunteer_id,
            rejected,
            "application accepted"
        );
        Ok(accepted)
    }

    /// Decline a pending application.
    pub fn reject(&self, application_id: &ApplicationId) -> Result<Application, MatchingError> {
        let application = self.store.transaction(|tx| {
            let mut application = tx
                .application(application_id)?
                .ok_or_else(|| MatchingError::ApplicationNotFound(application_id.clone()))?;
            if application.status != ApplicationStatus::Pending {
                return Err(MatchingError::CannotReject(application_id.clone()));
            }
            application.transition(ApplicationStatus::Rejected, Utc::now());
            tx.update_application(application.clone())?;
            Ok(application)
        })?;

        info!(application_id = %application.id, job_id = %application.job_id, "application rejected");
        Ok(application)
    }

    /// Applications on a job, first applied first.
    pub fn list_for_job(
        &self,
        job_id: &JobId,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, MatchingError> {
        let mut applications = self.store.transaction(|tx| {
            jobs::load(tx, job_id)?;
            Ok::<_, MatchingError>(tx.applications_for_job(job_id)?)
        })?;

        applications.retain(|application| status.map_or(true, |wanted| application.status == wanted));
        applications.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(applications)
    }

    /// A volunteer's application history, most recent first.
    pub fn list_for_volunteer(
        &self,
        volunteer_id: &UserId,
    ) -> Result<Vec<Application>, MatchingError> {
        let mut applications = self
            .store
            .transaction(|tx| tx.applications_for_volunteer(volunteer_id))?;

        applications.reverse();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    /// The volunteer's application on one job, if any.
    pub fn find(
        &self,
        job_id: &JobId,
        volunteer_id: &UserId,
    ) -> Result<Option<Application>, MatchingError> {
        Ok(self
            .store
            .transaction(|tx| tx.application_for(job_id, volunteer_id))?)
    }
}
