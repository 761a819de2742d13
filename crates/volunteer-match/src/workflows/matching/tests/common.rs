use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::matching::{
    matching_router, Application, DirectoryError, EntityStore, InMemoryStore, Job, JobId,
    Location, MatchingService, NewJob, Requirements, Schedule, StoreError, StoreTransaction,
    UserDirectory, UserId, UserProfile, UserRole,
};

pub(super) type Service = MatchingService<InMemoryStore, MemoryDirectory>;

#[derive(Default)]
pub(super) struct MemoryDirectory {
    profiles: Mutex<HashMap<UserId, UserProfile>>,
}

impl MemoryDirectory {
    pub(super) fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let directory = Self::default();
        for profile in profiles {
            directory.register(profile);
        }
        directory
    }

    pub(super) fn register(&self, profile: UserProfile) {
        self.profiles
            .lock()
            .expect("lock")
            .insert(profile.id.clone(), profile);
    }
}

impl UserDirectory for MemoryDirectory {
    fn exists(&self, user_id: &UserId) -> Result<bool, DirectoryError> {
        Ok(self.profiles.lock().expect("lock").contains_key(user_id))
    }

    fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.profiles.lock().expect("lock").get(user_id).cloned())
    }
}

pub(super) struct UnavailableDirectory;

impl UserDirectory for UnavailableDirectory {
    fn exists(&self, _user_id: &UserId) -> Result<bool, DirectoryError> {
        Err(DirectoryError::Unavailable("identity service timed out".to_string()))
    }

    fn profile(&self, _user_id: &UserId) -> Result<Option<UserProfile>, DirectoryError> {
        Err(DirectoryError::Unavailable("identity service timed out".to_string()))
    }
}

/// Store whose every transaction fails before running.
pub(super) struct UnavailableStore;

impl EntityStore for UnavailableStore {
    fn transaction<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        Err(StoreError::Unavailable("connection refused on 10.0.0.7:5432".to_string()).into())
    }
}

pub(super) fn requester() -> UserId {
    UserId::new("requester-1")
}

pub(super) fn volunteer(index: u8) -> UserId {
    UserId::new(format!("volunteer-{index}"))
}

pub(super) fn requester_profile() -> UserProfile {
    UserProfile {
        id: requester(),
        role: UserRole::Requester,
        first_name: "Somchai".to_string(),
        last_name: "Prasert".to_string(),
        phone: "+66 81 234 5678".to_string(),
        disability_type: Some("visual".to_string()),
    }
}

pub(super) fn volunteer_profile(index: u8, first_name: &str) -> UserProfile {
    UserProfile {
        id: volunteer(index),
        role: UserRole::Volunteer,
        first_name: first_name.to_string(),
        last_name: "Volunteer".to_string(),
        phone: format!("+66 80 000 000{index}"),
        disability_type: None,
    }
}

pub(super) fn directory() -> MemoryDirectory {
    MemoryDirectory::with_profiles([
        requester_profile(),
        volunteer_profile(1, "Anong"),
        volunteer_profile(2, "Niran"),
        volunteer_profile(3, "Kanya"),
    ])
}

pub(super) fn new_job(title: &str) -> NewJob {
    NewJob {
        title: title.to_string(),
        description: "Guide to the outpatient pharmacy and back".to_string(),
        location: Location {
            address: "Chulalongkorn Hospital, Bangkok".to_string(),
            meeting_point: "Main entrance".to_string(),
            latitude: 13.7326,
            longitude: 100.5359,
        },
        schedule: Schedule::default(),
        requirements: Requirements::new(["Thai speaker", "Sighted guide experience"]),
    }
}

pub(super) fn build_service() -> (Arc<Service>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(MatchingService::new(store.clone(), Arc::new(directory())));
    (service, store)
}

pub(super) fn posted_job(service: &Service) -> Job {
    service
        .create_job(&requester(), new_job("Pharmacy visit"))
        .expect("job created")
}

/// Job with volunteer 1 accepted and volunteer 2 rejected alongside.
pub(super) fn assigned_job(service: &Service) -> (Job, Application) {
    let job = posted_job(service);
    let accepted = service.apply(&job.id, &volunteer(1)).expect("apply 1");
    service.apply(&job.id, &volunteer(2)).expect("apply 2");
    let accepted = service.accept(&accepted.id).expect("accept");
    let job = service.jobs().get(&job.id).expect("job reloads");
    (job, accepted)
}

pub(super) fn completed_job(service: &Service) -> Job {
    let (job, _) = assigned_job(service);
    service
        .complete_job(&job.id, &volunteer(1))
        .expect("complete")
}

pub(super) fn stored_job(store: &InMemoryStore, job_id: &JobId) -> Job {
    store
        .job(job_id)
        .expect("store read")
        .expect("job present")
}

pub(super) fn router_for(service: Arc<Service>) -> axum::Router {
    matching_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
