use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MatchingError;

/// Identifier wrapper for posted jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

/// Identifier wrapper for volunteer applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

/// Identifier of a requester or volunteer owned by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ApplicationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a job posting.
///
/// `Open -> Assigned -> Completed` or `Open -> Cancelled`. An assigned job never re-enters
/// `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Assigned,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Assigned => "assigned",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled jobs accept no further edits.
    pub const fn is_final(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }
}

/// Status of a volunteer's application; `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Where the volunteer should show up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    #[serde(default)]
    pub meeting_point: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Optional work date and time window. Times accept `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "calendar_date"
    )]
    pub work_date: Option<NaiveDate>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time_of_day"
    )]
    pub start_time: Option<NaiveTime>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time_of_day"
    )]
    pub end_time: Option<NaiveTime>,
}

/// Ordered free-text requirements attached to a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requirements(Vec<String>);

impl Requirements {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            items
                .into_iter()
                .map(Into::into)
                .map(|item: String| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

/// Requester contact details captured when the job was posted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub phone: String,
}

/// A posted request for volunteer assistance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub requester_id: UserId,
    pub location: Location,
    pub schedule: Schedule,
    pub status: JobStatus,
    pub accepted_volunteer_id: Option<UserId>,
    pub distance_km: f64,
    pub requirements: Requirements,
    pub contact: ContactInfo,
    pub requester_rating: Option<u8>,
    pub requester_review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Fresh posting: open, unassigned, distance zero.
    pub fn open(
        requester_id: UserId,
        contact: ContactInfo,
        attrs: NewJob,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::generate(),
            title: attrs.title,
            description: attrs.description,
            requester_id,
            location: attrs.location,
            schedule: attrs.schedule,
            status: JobStatus::Open,
            accepted_volunteer_id: None,
            distance_km: 0.0,
            requirements: attrs.requirements,
            contact,
            requester_rating: None,
            requester_review: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Open for applications: status open and nobody bound yet.
    pub fn accepts_applications(&self) -> bool {
        self.status == JobStatus::Open && self.accepted_volunteer_id.is_none()
    }

    pub fn is_assigned_to(&self, volunteer_id: &UserId) -> bool {
        self.accepted_volunteer_id.as_ref() == Some(volunteer_id)
    }

    /// Holds when the volunteer binding and rating agree with the status.
    pub fn is_consistent(&self) -> bool {
        let bound = self.accepted_volunteer_id.is_some();
        let assigned_like = matches!(self.status, JobStatus::Assigned | JobStatus::Completed);
        let rating_ok = self.requester_rating.is_none() || self.status == JobStatus::Completed;
        bound == assigned_like && rating_ok
    }

    pub(crate) fn apply_patch(&mut self, patch: JobPatch, now: DateTime<Utc>) {
        let JobPatch {
            title,
            description,
            address,
            meeting_point,
            latitude,
            longitude,
            schedule,
            requirements,
        } = patch;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(address) = address {
            self.location.address = address;
        }
        if let Some(meeting_point) = meeting_point {
            self.location.meeting_point = meeting_point;
        }
        if let Some(latitude) = latitude {
            self.location.latitude = latitude;
        }
        if let Some(longitude) = longitude {
            self.location.longitude = longitude;
        }
        if let Some(schedule) = schedule {
            self.schedule = schedule;
        }
        if let Some(requirements) = requirements {
            self.requirements = requirements;
        }
        self.updated_at = now;
    }
}

/// Requester-supplied attributes for a new job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: Location,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub requirements: Requirements,
}

/// Partial edit of a job's descriptive fields. Lifecycle fields are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub meeting_point: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Replaces the whole schedule when present.
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub requirements: Option<Requirements>,
}

/// A volunteer's expressed interest in a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub volunteer_id: UserId,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn pending(job_id: JobId, volunteer_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: ApplicationId::generate(),
            job_id,
            volunteer_id,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn transition(&mut self, status: ApplicationStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

/// Rating projection of a volunteer kept alongside jobs and applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerStats {
    pub volunteer_id: UserId,
    pub rating: f64,
    pub completed_jobs: u32,
}

impl VolunteerStats {
    pub fn new(volunteer_id: UserId) -> Self {
        Self {
            volunteer_id,
            rating: 0.0,
            completed_jobs: 0,
        }
    }
}

/// Requester feedback score, an integer from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = MatchingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(MatchingError::InvalidRating(value))
        }
    }
}

mod calendar_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(Some)
                .map_err(|err| {
                    serde::de::Error::custom(format!("failed to parse '{value}' as YYYY-MM-DD ({err})"))
                }),
        }
    }
}

mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format("%H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse(value).map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub(super) fn parse(raw: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .map_err(|err| format!("failed to parse '{raw}' as HH:MM or HH:MM:SS ({err})"))
    }
}
