use std::collections::HashMap;
use std::sync::Arc;

use super::applications::ApplicationLifecycle;
use super::directory::{UserDirectory, UserProfile};
use super::domain::{
    Application, ApplicationId, ApplicationStatus, Job, JobId, JobPatch, NewJob, UserId,
    VolunteerStats,
};
use super::error::MatchingError;
use super::jobs::JobLifecycle;
use super::ratings::{RatingAggregator, RatingOutcome};
use super::store::EntityStore;
use super::views::{
    JobApplicationView, JobSummary, JobView, ReviewView, VolunteerApplicationView,
    VolunteerProfileView,
};

/// Facade composing the lifecycle managers with directory lookups for API responses.
///
/// The managers only talk to each other through the store; this type just routes calls and
/// decorates results.
pub struct MatchingService<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
    jobs: JobLifecycle<S, D>,
    applications: ApplicationLifecycle<S>,
    ratings: RatingAggregator<S>,
}

impl<S, D> MatchingService<S, D>
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>) -> Self {
        Self {
            jobs: JobLifecycle::new(store.clone(), directory.clone()),
            applications: ApplicationLifecycle::new(store.clone()),
            ratings: RatingAggregator::new(store.clone()),
            store,
            directory,
        }
    }

    pub fn jobs(&self) -> &JobLifecycle<S, D> {
        &self.jobs
    }

    pub fn applications(&self) -> &ApplicationLifecycle<S> {
        &self.applications
    }

    pub fn ratings(&self) -> &RatingAggregator<S> {
        &self.ratings
    }

    pub fn create_job(&self, requester_id: &UserId, attrs: NewJob) -> Result<Job, MatchingError> {
        self.jobs.create(requester_id, attrs)
    }

    /// Job detail; a viewing volunteer also sees their own application status.
    pub fn job_view(
        &self,
        job_id: &JobId,
        viewer: Option<&UserId>,
    ) -> Result<JobView, MatchingError> {
        let job = self.jobs.get(job_id)?;
        let application_status = match viewer {
            Some(volunteer_id) => self
                .applications
                .find(job_id, volunteer_id)?
                .map(|application| application.status),
            None => None,
        };
        let requester_disability_type = self.disability_type(&job.requester_id)?;
        let accepted_volunteer_name = self.accepted_volunteer_name(&job)?;

        Ok(JobView {
            job,
            application_status,
            requester_disability_type,
            accepted_volunteer_name,
        })
    }

    /// Every job, newest first, annotated with the viewer's application status and the
    /// requester's disability type.
    pub fn list_jobs(&self, viewer: Option<&UserId>) -> Result<Vec<JobView>, MatchingError> {
        let statuses: HashMap<JobId, ApplicationStatus> = match viewer {
            Some(volunteer_id) => self
                .applications
                .list_for_volunteer(volunteer_id)?
                .into_iter()
                .map(|application| (application.job_id, application.status))
                .collect(),
            None => HashMap::new(),
        };

        let mut disability_types: HashMap<UserId, Option<String>> = HashMap::new();
        self.jobs
            .list()?
            .into_iter()
            .map(|job| {
                let requester_disability_type = match disability_types.get(&job.requester_id) {
                    Some(cached) => cached.clone(),
                    None => {
                        let looked_up = self.disability_type(&job.requester_id)?;
                        disability_types.insert(job.requester_id.clone(), looked_up.clone());
                        looked_up
                    }
                };
                let application_status = statuses.get(&job.id).copied();
                Ok(JobView {
                    application_status,
                    requester_disability_type,
                    ..JobView::new(job)
                })
            })
            .collect()
    }

    /// A requester's postings with the accepted volunteer's name filled in.
    pub fn requester_jobs(&self, requester_id: &UserId) -> Result<Vec<JobView>, MatchingError> {
        self.jobs
            .list_for_requester(requester_id)?
            .into_iter()
            .map(|job| {
                let accepted_volunteer_name = self.accepted_volunteer_name(&job)?;
                Ok(JobView {
                    accepted_volunteer_name,
                    ..JobView::new(job)
                })
            })
            .collect()
    }

    pub fn update_job(&self, job_id: &JobId, patch: JobPatch) -> Result<Job, MatchingError> {
        self.jobs.update(job_id, patch)
    }

    pub fn cancel_job(&self, job_id: &JobId) -> Result<Job, MatchingError> {
        self.jobs.cancel(job_id)
    }

    pub fn complete_job(&self, job_id: &JobId, volunteer_id: &UserId) -> Result<Job, MatchingError> {
        self.jobs.complete(job_id, volunteer_id)
    }

    pub fn apply(&self, job_id: &JobId, volunteer_id: &UserId) -> Result<Application, MatchingError> {
        self.applications.apply(job_id, volunteer_id)
    }

    pub fn cancel_application(
        &self,
        job_id: &JobId,
        volunteer_id: &UserId,
    ) -> Result<(), MatchingError> {
        self.applications.cancel(job_id, volunteer_id)
    }

    pub fn accept(&self, application_id: &ApplicationId) -> Result<Application, MatchingError> {
        self.applications.accept(application_id)
    }

    pub fn reject(&self, application_id: &ApplicationId) -> Result<Application, MatchingError> {
        self.applications.reject(application_id)
    }

    /// Applicants on a job with their profile and rating projection.
    pub fn job_applications(
        &self,
        job_id: &JobId,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<JobApplicationView>, MatchingError> {
        self.applications
            .list_for_job(job_id, status)?
            .into_iter()
            .map(|application| {
                let profile = self.directory.profile(&application.volunteer_id)?;
                let stats = self.volunteer_stats(&application.volunteer_id)?;
                Ok(JobApplicationView {
                    volunteer_name: profile.as_ref().map(UserProfile::display_name),
                    volunteer_phone: profile.map(|profile| profile.phone),
                    volunteer_rating: stats.rating,
                    volunteer_completed_jobs: stats.completed_jobs,
                    application,
                })
            })
            .collect()
    }

    /// A volunteer's applications, most recent first, each with a summary of its job.
    pub fn volunteer_applications(
        &self,
        volunteer_id: &UserId,
    ) -> Result<Vec<VolunteerApplicationView>, MatchingError> {
        let mut views = Vec::new();
        for application in self.applications.list_for_volunteer(volunteer_id)? {
            let Some(job) = self.store.job(&application.job_id)? else {
                continue;
            };
            let disability_type = self.disability_type(&job.requester_id)?;
            views.push(VolunteerApplicationView {
                job: JobSummary::from_job(&job, disability_type),
                application,
            });
        }
        Ok(views)
    }

    pub fn rate(
        &self,
        job_id: &JobId,
        rating: i64,
        review: Option<String>,
    ) -> Result<RatingOutcome, MatchingError> {
        self.ratings.rate(job_id, rating, review)
    }

    pub fn reviews(&self, volunteer_id: &UserId) -> Result<Vec<ReviewView>, MatchingError> {
        Ok(self
            .ratings
            .reviews_for_volunteer(volunteer_id)?
            .iter()
            .filter_map(ReviewView::from_job)
            .collect())
    }

    pub fn volunteer_stats(&self, volunteer_id: &UserId) -> Result<VolunteerStats, MatchingError> {
        Ok(self
            .store
            .transaction(|tx| tx.volunteer_stats(volunteer_id))?)
    }

    /// Directory profile merged with the rating projection.
    pub fn profile(&self, user_id: &UserId) -> Result<VolunteerProfileView, MatchingError> {
        let profile = self
            .directory
            .profile(user_id)?
            .ok_or_else(|| MatchingError::UserNotFound(user_id.clone()))?;
        let stats = self.volunteer_stats(user_id)?;
        Ok(VolunteerProfileView::new(profile, stats))
    }

    fn disability_type(&self, user_id: &UserId) -> Result<Option<String>, MatchingError> {
        Ok(self
            .directory
            .profile(user_id)?
            .and_then(|profile| profile.disability_type))
    }

    fn accepted_volunteer_name(&self, job: &Job) -> Result<Option<String>, MatchingError> {
        let Some(volunteer_id) = job.accepted_volunteer_id.as_ref() else {
            return Ok(None);
        };
        Ok(self
            .directory
            .profile(volunteer_id)?
            .map(|profile| profile.display_name()))
    }
}
