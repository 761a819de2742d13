//! Read models returned by the matching service and router.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::directory::UserProfile;
use super::domain::{
    Application, ApplicationStatus, Job, JobId, JobStatus, Location, Schedule, UserId,
    VolunteerStats,
};

/// A job enriched for whoever is looking at it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: Job,
    /// The viewing volunteer's own application status, when they applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_disability_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_volunteer_name: Option<String>,
}

impl JobView {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            application_status: None,
            requester_disability_type: None,
            accepted_volunteer_name: None,
        }
    }
}

/// An application as the requester sees it: who applied and how they have been rated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobApplicationView {
    #[serde(flatten)]
    pub application: Application,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volunteer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volunteer_phone: Option<String>,
    pub volunteer_rating: f64,
    pub volunteer_completed_jobs: u32,
}

/// Job fields shown next to a volunteer's application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub status: JobStatus,
    pub requester_id: UserId,
    pub location: Location,
    pub schedule: Schedule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_disability_type: Option<String>,
}

impl JobSummary {
    pub fn from_job(job: &Job, requester_disability_type: Option<String>) -> Self {
        Self {
            id: job.id.clone(),
            title: job.title.clone(),
            description: job.description.clone(),
            status: job.status,
            requester_id: job.requester_id.clone(),
            location: job.location.clone(),
            schedule: job.schedule.clone(),
            requester_disability_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolunteerApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub job: JobSummary,
}

/// One piece of requester feedback left for a volunteer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    pub job_id: JobId,
    pub job_title: String,
    pub requester_id: UserId,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewView {
    /// `None` for jobs that carry no rating.
    pub fn from_job(job: &Job) -> Option<Self> {
        job.requester_rating.map(|rating| Self {
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            requester_id: job.requester_id.clone(),
            rating,
            review: job.requester_review.clone(),
            reviewed_at: job.updated_at,
        })
    }
}

/// Directory profile merged with the rating projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolunteerProfileView {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub rating: f64,
    pub completed_jobs: u32,
}

impl VolunteerProfileView {
    pub fn new(profile: UserProfile, stats: VolunteerStats) -> Self {
        Self {
            profile,
            rating: stats.rating,
            completed_jobs: stats.completed_jobs,
        }
    }
}
