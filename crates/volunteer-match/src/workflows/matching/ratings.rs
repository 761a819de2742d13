use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::domain::{Job, JobId, JobStatus, Rating, UserId, VolunteerStats};
use super::error::MatchingError;
use super::jobs;
use super::store::EntityStore;

/// Result of a successful rating: the rated job and the volunteer's refreshed projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingOutcome {
    pub job: Job,
    pub volunteer: VolunteerStats,
}

/// Accepts requester feedback on completed jobs and maintains each volunteer's running mean.
pub struct RatingAggregator<S> {
    store: Arc<S>,
}

impl<S> RatingAggregator<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Rate a completed job once. Out-of-range scores are refused before any read.
    pub fn rate(
        &self,
        job_id: &JobId,
        rating: i64,
        review: Option<String>,
    ) -> Result<RatingOutcome, MatchingError> {
        let rating = Rating::try_from(rating)?;
        let review = review
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        let outcome = self.store.transaction(|tx| {
            let mut job = jobs::load(tx, job_id)?;
            if job.status != JobStatus::Completed {
                return Err(MatchingError::JobNotCompleted(job_id.clone()));
            }
            let Some(volunteer_id) = job.accepted_volunteer_id.clone() else {
                return Err(MatchingError::NoVolunteerAssigned(job_id.clone()));
            };
            if job.requester_rating.is_some() {
                return Err(MatchingError::AlreadyRated(job_id.clone()));
            }

            job.requester_rating = Some(rating.value());
            job.requester_review = review.clone();
            job.updated_at = Utc::now();
            tx.update_job(job.clone())?;

            let mut stats = tx.volunteer_stats(&volunteer_id)?;
            stats.rating = running_average(stats.rating, stats.completed_jobs, rating);
            tx.put_volunteer_stats(stats.clone())?;

            Ok(RatingOutcome {
                job,
                volunteer: stats,
            })
        })?;

        info!(
            job_id = %job_id,
            volunteer_id = %outcome.volunteer.volunteer_id,
            rating = rating.value(),
            average = outcome.volunteer.rating,
            "job rated"
        );
        Ok(outcome)
    }

    /// Rated completed jobs of one volunteer, latest feedback first.
    pub fn reviews_for_volunteer(&self, volunteer_id: &UserId) -> Result<Vec<Job>, MatchingError> {
        let mut rated: Vec<Job> = self
            .store
            .transaction(|tx| tx.jobs())?
            .into_iter()
            .filter(|job| {
                job.status == JobStatus::Completed
                    && job.is_assigned_to(volunteer_id)
                    && job.requester_rating.is_some()
            })
            .collect();

        rated.reverse();
        rated.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rated)
    }
}

/// Fold one more score into a running mean.
///
/// `completed_jobs` already counts the job being rated, so its score carries weight
/// `1 / completed_jobs`.
pub fn running_average(prior_average: f64, completed_jobs: u32, rating: Rating) -> f64 {
    let score = f64::from(rating.value());
    if completed_jobs <= 1 {
        return score;
    }
    let count = f64::from(completed_jobs);
    (prior_average * (count - 1.0) + score) / count
}
