//! On-disk snapshot of the committed tables.
//!
//! Job rows are flattened the way a relational table would hold them; the requirements list is
//! stored as JSON array text and only decoded back into [`Requirements`] here.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::memory::Tables;
use super::StoreError;
use crate::workflows::matching::domain::{
    Application, ContactInfo, Job, JobId, JobStatus, Location, Requirements, Schedule, UserId,
    VolunteerStats,
};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    format: u32,
    jobs: Vec<JobRow>,
    applications: Vec<Application>,
    volunteers: Vec<VolunteerStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct JobRow {
    id: JobId,
    title: String,
    description: String,
    requester_id: UserId,
    address: String,
    meeting_point: String,
    latitude: f64,
    longitude: f64,
    schedule: Schedule,
    status: JobStatus,
    accepted_volunteer_id: Option<UserId>,
    distance_km: f64,
    requirements: String,
    contact_name: String,
    contact_number: String,
    requester_rating: Option<u8>,
    requester_review: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn encode(job: &Job) -> Result<Self, StoreError> {
        Ok(Self {
            id: job.id.clone(),
            title: job.title.clone(),
            description: job.description.clone(),
            requester_id: job.requester_id.clone(),
            address: job.location.address.clone(),
            meeting_point: job.location.meeting_point.clone(),
            latitude: job.location.latitude,
            longitude: job.location.longitude,
            schedule: job.schedule.clone(),
            status: job.status,
            accepted_volunteer_id: job.accepted_volunteer_id.clone(),
            distance_km: job.distance_km,
            requirements: encode_requirements(&job.requirements)?,
            contact_name: job.contact.name.clone(),
            contact_number: job.contact.phone.clone(),
            requester_rating: job.requester_rating,
            requester_review: job.requester_review.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        })
    }

    fn decode(self) -> Job {
        Job {
            id: self.id,
            title: self.title,
            description: self.description,
            requester_id: self.requester_id,
            location: Location {
                address: self.address,
                meeting_point: self.meeting_point,
                latitude: self.latitude,
                longitude: self.longitude,
            },
            schedule: self.schedule,
            status: self.status,
            accepted_volunteer_id: self.accepted_volunteer_id,
            distance_km: self.distance_km,
            requirements: decode_requirements(&self.requirements),
            contact: ContactInfo {
                name: self.contact_name,
                phone: self.contact_number,
            },
            requester_rating: self.requester_rating,
            requester_review: self.requester_review,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn encode_requirements(requirements: &Requirements) -> Result<String, StoreError> {
    serde_json::to_string(requirements.as_slice())
        .map_err(|err| StoreError::Unavailable(format!("requirements encoding failed: {err}")))
}

/// JSON array text; older rows hold comma-separated text.
fn decode_requirements(raw: &str) -> Requirements {
    let raw = raw.trim();
    if raw.is_empty() {
        return Requirements::default();
    }
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(items) => Requirements::new(items),
        Err(_) => Requirements::new(raw.split(',')),
    }
}

pub(super) fn load(path: &Path) -> Result<Option<Tables>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(path).map_err(|err| {
        StoreError::Unavailable(format!("failed to read snapshot {}: {err}", path.display()))
    })?;
    let snapshot: StoreSnapshot = serde_json::from_slice(&bytes).map_err(|err| {
        StoreError::Unavailable(format!("snapshot {} is unreadable: {err}", path.display()))
    })?;
    if snapshot.format != FORMAT_VERSION {
        return Err(StoreError::Unavailable(format!(
            "snapshot {} has unsupported format {}",
            path.display(),
            snapshot.format
        )));
    }

    let mut tables = Tables::default();
    for row in snapshot.jobs {
        let job = row.decode();
        tables.job_order.push(job.id.clone());
        tables.jobs.insert(job.id.clone(), job);
    }
    for application in snapshot.applications {
        tables.index_application(&application);
        tables
            .applications
            .insert(application.id.clone(), application);
    }
    for stats in snapshot.volunteers {
        tables.volunteers.insert(stats.volunteer_id.clone(), stats);
    }
    Ok(Some(tables))
}

/// Write the full state to a sibling temp file, then rename over `path`.
pub(super) fn persist(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    let jobs = tables
        .job_order
        .iter()
        .filter_map(|id| tables.jobs.get(id))
        .map(JobRow::encode)
        .collect::<Result<Vec<_>, _>>()?;
    let applications = tables
        .application_order
        .iter()
        .filter_map(|id| tables.applications.get(id))
        .cloned()
        .collect();
    let mut volunteers: Vec<VolunteerStats> = tables.volunteers.values().cloned().collect();
    volunteers.sort_by(|a, b| a.volunteer_id.cmp(&b.volunteer_id));

    let snapshot = StoreSnapshot {
        format: FORMAT_VERSION,
        jobs,
        applications,
        volunteers,
    };
    let bytes = serde_json::to_vec_pretty(&snapshot)
        .map_err(|err| StoreError::Unavailable(format!("snapshot encoding failed: {err}")))?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            StoreError::Unavailable(format!("failed to create {}: {err}", parent.display()))
        })?;
    }
    let staging = path.with_extension("tmp");
    fs::write(&staging, bytes).map_err(|err| {
        StoreError::Unavailable(format!("failed to write {}: {err}", staging.display()))
    })?;
    fs::rename(&staging, path).map_err(|err| {
        StoreError::Unavailable(format!("failed to replace {}: {err}", path.display()))
    })
}
