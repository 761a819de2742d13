use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use volunteer_match::workflows::matching::{
    DirectoryError, InMemoryStore, MatchingService, UserDirectory, UserId, UserProfile, UserRole,
};

pub(crate) type ApiMatchingService = MatchingService<InMemoryStore, InMemoryUserDirectory>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) directory: Arc<InMemoryUserDirectory>,
    pub(crate) matching: Arc<ApiMatchingService>,
}

/// Process-local stand-in for the identity service.
#[derive(Default, Clone)]
pub(crate) struct InMemoryUserDirectory {
    profiles: Arc<Mutex<HashMap<UserId, UserProfile>>>,
}

impl InMemoryUserDirectory {
    /// Directory pre-populated with the users the CLI demo walks through.
    pub(crate) fn seeded() -> Result<Self, DirectoryError> {
        let directory = Self::default();
        for profile in demo_profiles() {
            directory.register(profile)?;
        }
        Ok(directory)
    }

    /// Returns `Ok(false)` when the id is already taken.
    pub(crate) fn register(&self, profile: UserProfile) -> Result<bool, DirectoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&profile.id) {
            return Ok(false);
        }
        guard.insert(profile.id.clone(), profile);
        Ok(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<UserId, UserProfile>>, DirectoryError> {
        self.profiles
            .lock()
            .map_err(|_| DirectoryError::Unavailable("directory mutex poisoned".to_string()))
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn exists(&self, user_id: &UserId) -> Result<bool, DirectoryError> {
        Ok(self.lock()?.contains_key(user_id))
    }

    fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.lock()?.get(user_id).cloned())
    }
}

pub(crate) fn demo_requester() -> UserId {
    UserId::new("requester-ploy")
}

pub(crate) fn demo_volunteers() -> [UserId; 2] {
    [UserId::new("volunteer-arthit"), UserId::new("volunteer-mali")]
}

fn demo_profiles() -> Vec<UserProfile> {
    let [arthit, mali] = demo_volunteers();
    vec![
        UserProfile {
            id: demo_requester(),
            role: UserRole::Requester,
            first_name: "Ploy".to_string(),
            last_name: "Srisuk".to_string(),
            phone: "+66 89 555 0101".to_string(),
            disability_type: Some("visual".to_string()),
        },
        UserProfile {
            id: arthit,
            role: UserRole::Volunteer,
            first_name: "Arthit".to_string(),
            last_name: "Chaiyo".to_string(),
            phone: "+66 89 555 0202".to_string(),
            disability_type: None,
        },
        UserProfile {
            id: mali,
            role: UserRole::Volunteer,
            first_name: "Mali".to_string(),
            last_name: "Wongsa".to_string(),
            phone: "+66 89 555 0303".to_string(),
            disability_type: None,
        },
    ]
}
