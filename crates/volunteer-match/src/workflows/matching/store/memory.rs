use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, error, warn};

use super::snapshot;
use super::{EntityKind, EntityStore, StoreError, StoreTransaction, UniqueKey};
use crate::config::StoreConfig;
use crate::workflows::matching::domain::{
    Application, ApplicationId, Job, JobId, UserId, VolunteerStats,
};

/// Versioned unit of conflict detection: a row or a secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RowKey {
    Job(JobId),
    JobIndex,
    Application(ApplicationId),
    JobApplications(JobId),
    VolunteerApplications(UserId),
    Volunteer(UserId),
}

/// Committed state. Index vectors keep insertion order.
#[derive(Debug, Default, Clone)]
pub(super) struct Tables {
    pub(super) jobs: HashMap<JobId, Job>,
    pub(super) job_order: Vec<JobId>,
    pub(super) applications: HashMap<ApplicationId, Application>,
    pub(super) application_order: Vec<ApplicationId>,
    pub(super) by_job: HashMap<JobId, Vec<ApplicationId>>,
    pub(super) by_volunteer: HashMap<UserId, Vec<ApplicationId>>,
    pub(super) volunteers: HashMap<UserId, VolunteerStats>,
    versions: HashMap<RowKey, u64>,
    clock: u64,
}

impl Tables {
    fn version(&self, key: &RowKey) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn stamp(&mut self, keys: Vec<RowKey>) {
        self.clock += 1;
        let clock = self.clock;
        for key in keys {
            self.versions.insert(key, clock);
        }
    }

    pub(super) fn index_application(&mut self, application: &Application) {
        self.application_order.push(application.id.clone());
        self.by_job
            .entry(application.job_id.clone())
            .or_default()
            .push(application.id.clone());
        self.by_volunteer
            .entry(application.volunteer_id.clone())
            .or_default()
            .push(application.id.clone());
    }

    fn unindex_application(&mut self, application: &Application) {
        self.application_order.retain(|id| id != &application.id);
        if let Some(ids) = self.by_job.get_mut(&application.job_id) {
            ids.retain(|id| id != &application.id);
        }
        if let Some(ids) = self.by_volunteer.get_mut(&application.volunteer_id) {
            ids.retain(|id| id != &application.id);
        }
    }

    fn pair_taken(&self, job_id: &JobId, volunteer_id: &UserId) -> bool {
        self.by_job
            .get(job_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.applications.get(id))
            .any(|application| &application.volunteer_id == volunteer_id)
    }
}

/// Process-local entity store with optimistic, version-validated transactions.
///
/// Every row and secondary index carries a version. A transaction records the version of
/// everything it reads and buffers its writes; commit holds the table lock only while it checks
/// that nothing read has moved and applies the buffered writes. Transactions over disjoint rows
/// therefore never invalidate one another, while two transactions touching the same row are
/// serialized: the later one re-runs against the committed state.
#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    snapshot_path: Option<PathBuf>,
    max_attempts: u32,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            snapshot_path: None,
            max_attempts: StoreConfig::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Open the store described by `config`, loading the snapshot file when one exists.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let tables = match &config.snapshot_path {
            Some(path) => snapshot::load(path)?.unwrap_or_default(),
            None => Tables::default(),
        };

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot_path: config.snapshot_path.clone(),
            max_attempts: config.max_attempts.max(1),
        })
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn commit(&self, tx: MemoryTransaction<'_>) -> Result<(), CommitError> {
        if tx.is_read_only() {
            let tables = read_lock(&self.tables)?;
            return if tx.is_valid(&tables) {
                Ok(())
            } else {
                Err(CommitError::Stale)
            };
        }

        let mut tables = write_lock(&self.tables)?;
        if !tx.is_valid(&tables) {
            return Err(CommitError::Stale);
        }
        tx.check_constraints(&tables)?;

        let Some(path) = &self.snapshot_path else {
            tx.apply(&mut tables);
            return Ok(());
        };

        let previous = tables.clone();
        tx.apply(&mut tables);
        if let Err(err) = snapshot::persist(path, &tables) {
            error!(path = %path.display(), error = %err, "snapshot persist failed, rolling back commit");
            *tables = previous;
            return Err(CommitError::Store(err));
        }
        Ok(())
    }
}

impl EntityStore for InMemoryStore {
    fn transaction<T, E, F>(&self, mut work: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        for attempt in 1..=self.max_attempts {
            let mut tx = MemoryTransaction::new(&self.tables);
            match work(&mut tx) {
                Ok(value) => match self.commit(tx) {
                    Ok(()) => return Ok(value),
                    Err(CommitError::Stale) => {
                        debug!(attempt, "transaction read stale rows, retrying");
                    }
                    Err(CommitError::Store(err)) => return Err(err.into()),
                },
                Err(err) => {
                    // A failure computed from rows that have since moved is re-evaluated.
                    if tx.is_stale()? {
                        debug!(attempt, "transaction failed on stale rows, retrying");
                    } else {
                        return Err(err);
                    }
                }
            }
            std::thread::yield_now();
        }

        warn!(
            attempts = self.max_attempts,
            "transaction abandoned under contention"
        );
        Err(StoreError::Contention {
            attempts: self.max_attempts,
        }
        .into())
    }
}

enum CommitError {
    Stale,
    Store(StoreError),
}

impl From<StoreError> for CommitError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

fn read_lock(tables: &RwLock<Tables>) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
    tables
        .read()
        .map_err(|_| StoreError::Unavailable("table lock poisoned".to_string()))
}

fn write_lock(tables: &RwLock<Tables>) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
    tables
        .write()
        .map_err(|_| StoreError::Unavailable("table lock poisoned".to_string()))
}

#[derive(Debug, Clone)]
enum Staged<T> {
    Inserted(T),
    Updated(T),
    Deleted(T),
}

impl<T> Staged<T> {
    fn current(&self) -> Option<&T> {
        match self {
            Staged::Inserted(value) | Staged::Updated(value) => Some(value),
            Staged::Deleted(_) => None,
        }
    }
}

struct MemoryTransaction<'s> {
    tables: &'s RwLock<Tables>,
    reads: HashMap<RowKey, u64>,
    jobs: HashMap<JobId, Job>,
    job_inserts: Vec<JobId>,
    applications: HashMap<ApplicationId, Staged<Application>>,
    application_inserts: Vec<ApplicationId>,
    volunteers: HashMap<UserId, VolunteerStats>,
}

impl<'s> MemoryTransaction<'s> {
    fn new(tables: &'s RwLock<Tables>) -> Self {
        Self {
            tables,
            reads: HashMap::new(),
            jobs: HashMap::new(),
            job_inserts: Vec::new(),
            applications: HashMap::new(),
            application_inserts: Vec::new(),
            volunteers: HashMap::new(),
        }
    }

    /// Remember the first version seen; a later mismatch fails validation.
    fn observe(&mut self, tables: &Tables, key: RowKey) {
        let version = tables.version(&key);
        self.reads.entry(key).or_insert(version);
    }

    fn is_read_only(&self) -> bool {
        self.jobs.is_empty() && self.applications.is_empty() && self.volunteers.is_empty()
    }

    fn is_valid(&self, tables: &Tables) -> bool {
        self.reads
            .iter()
            .all(|(key, version)| tables.version(key) == *version)
    }

    fn is_stale(&self) -> Result<bool, StoreError> {
        let tables = read_lock(self.tables)?;
        Ok(!self.is_valid(&tables))
    }

    fn check_constraints(&self, tables: &Tables) -> Result<(), StoreError> {
        for id in self.jobs.keys() {
            let inserted = self.job_inserts.contains(id);
            let exists = tables.jobs.contains_key(id);
            if inserted && exists {
                return Err(StoreError::DuplicateKey(UniqueKey::JobId));
            }
            if !inserted && !exists {
                return Err(StoreError::not_found(EntityKind::Job, id));
            }
        }

        for (id, staged) in &self.applications {
            match staged {
                Staged::Inserted(application) => {
                    if tables.applications.contains_key(id) {
                        return Err(StoreError::DuplicateKey(UniqueKey::ApplicationId));
                    }
                    let freed = self.applications.values().any(|other| {
                        matches!(other, Staged::Deleted(old)
                            if old.job_id == application.job_id
                                && old.volunteer_id == application.volunteer_id)
                    });
                    if !freed && tables.pair_taken(&application.job_id, &application.volunteer_id)
                    {
                        return Err(StoreError::DuplicateKey(UniqueKey::JobVolunteer));
                    }
                }
                Staged::Updated(_) | Staged::Deleted(_) => {
                    if !tables.applications.contains_key(id) {
                        return Err(StoreError::not_found(EntityKind::Application, id));
                    }
                }
            }
        }

        Ok(())
    }

    fn apply(self, tables: &mut Tables) {
        let mut touched = Vec::new();

        for (id, job) in self.jobs {
            if self.job_inserts.contains(&id) {
                tables.job_order.push(id.clone());
                touched.push(RowKey::JobIndex);
            }
            tables.jobs.insert(id.clone(), job);
            touched.push(RowKey::Job(id));
        }

        // Deletions first so a delete-then-reinsert of the same pair indexes cleanly.
        let mut inserts = Vec::new();
        for (id, staged) in self.applications {
            match staged {
                Staged::Deleted(application) => {
                    tables.applications.remove(&id);
                    tables.unindex_application(&application);
                    touched.push(RowKey::JobApplications(application.job_id));
                    touched.push(RowKey::VolunteerApplications(application.volunteer_id));
                    touched.push(RowKey::Application(id));
                }
                Staged::Updated(application) => {
                    tables.applications.insert(id.clone(), application);
                    touched.push(RowKey::Application(id));
                }
                Staged::Inserted(application) => inserts.push(application),
            }
        }

        inserts.sort_by_key(|application| {
            self.application_inserts
                .iter()
                .position(|id| id == &application.id)
        });
        for application in inserts {
            tables.index_application(&application);
            touched.push(RowKey::JobApplications(application.job_id.clone()));
            touched.push(RowKey::VolunteerApplications(
                application.volunteer_id.clone(),
            ));
            touched.push(RowKey::Application(application.id.clone()));
            tables
                .applications
                .insert(application.id.clone(), application);
        }

        for (id, stats) in self.volunteers {
            tables.volunteers.insert(id.clone(), stats);
            touched.push(RowKey::Volunteer(id));
        }

        tables.stamp(touched);
    }

    fn stage_application(&mut self, application: Application) {
        let inserted = matches!(
            self.applications.get(&application.id),
            Some(Staged::Inserted(_))
        );
        let id = application.id.clone();
        let staged = if inserted {
            Staged::Inserted(application)
        } else {
            Staged::Updated(application)
        };
        self.applications.insert(id, staged);
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn job(&mut self, id: &JobId) -> Result<Option<Job>, StoreError> {
        if let Some(job) = self.jobs.get(id) {
            return Ok(Some(job.clone()));
        }
        let tables = read_lock(self.tables)?;
        self.observe(&tables, RowKey::Job(id.clone()));
        Ok(tables.jobs.get(id).cloned())
    }

    fn jobs(&mut self) -> Result<Vec<Job>, StoreError> {
        let tables = read_lock(self.tables)?;
        self.observe(&tables, RowKey::JobIndex);

        let mut jobs = Vec::with_capacity(tables.job_order.len() + self.job_inserts.len());
        for id in &tables.job_order {
            if let Some(job) = self.jobs.get(id) {
                jobs.push(job.clone());
                continue;
            }
            self.observe(&tables, RowKey::Job(id.clone()));
            if let Some(job) = tables.jobs.get(id) {
                jobs.push(job.clone());
            }
        }
        drop(tables);

        for id in &self.job_inserts {
            if let Some(job) = self.jobs.get(id) {
                jobs.push(job.clone());
            }
        }
        Ok(jobs)
    }

    fn insert_job(&mut self, job: Job) -> Result<(), StoreError> {
        if self.job(&job.id)?.is_some() {
            return Err(StoreError::DuplicateKey(UniqueKey::JobId));
        }
        self.job_inserts.push(job.id.clone());
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn update_job(&mut self, job: Job) -> Result<(), StoreError> {
        if self.job(&job.id)?.is_none() {
            return Err(StoreError::not_found(EntityKind::Job, &job.id));
        }
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn application(&mut self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        if let Some(staged) = self.applications.get(id) {
            return Ok(staged.current().cloned());
        }
        let tables = read_lock(self.tables)?;
        self.observe(&tables, RowKey::Application(id.clone()));
        Ok(tables.applications.get(id).cloned())
    }

    fn applications_for_job(&mut self, job_id: &JobId) -> Result<Vec<Application>, StoreError> {
        let tables = read_lock(self.tables)?;
        self.observe(&tables, RowKey::JobApplications(job_id.clone()));
        let ids = tables.by_job.get(job_id).cloned().unwrap_or_default();

        let mut applications = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(staged) = self.applications.get(&id) {
                applications.extend(staged.current().cloned());
                continue;
            }
            self.observe(&tables, RowKey::Application(id.clone()));
            if let Some(application) = tables.applications.get(&id) {
                applications.push(application.clone());
            }
        }
        drop(tables);

        for id in &self.application_inserts {
            if let Some(Staged::Inserted(application)) = self.applications.get(id) {
                if &application.job_id == job_id {
                    applications.push(application.clone());
                }
            }
        }
        Ok(applications)
    }

    fn applications_for_volunteer(
        &mut self,
        volunteer_id: &UserId,
    ) -> Result<Vec<Application>, StoreError> {
        let tables = read_lock(self.tables)?;
        self.observe(&tables, RowKey::VolunteerApplications(volunteer_id.clone()));
        let ids = tables
            .by_volunteer
            .get(volunteer_id)
            .cloned()
            .unwrap_or_default();

        let mut applications = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(staged) = self.applications.get(&id) {
                applications.extend(staged.current().cloned());
                continue;
            }
            self.observe(&tables, RowKey::Application(id.clone()));
            if let Some(application) = tables.applications.get(&id) {
                applications.push(application.clone());
            }
        }
        drop(tables);

        for id in &self.application_inserts {
            if let Some(Staged::Inserted(application)) = self.applications.get(id) {
                if &application.volunteer_id == volunteer_id {
                    applications.push(application.clone());
                }
            }
        }
        Ok(applications)
    }

    fn insert_application(&mut self, application: Application) -> Result<(), StoreError> {
        if self.application(&application.id)?.is_some() {
            return Err(StoreError::DuplicateKey(UniqueKey::ApplicationId));
        }
        if self
            .application_for(&application.job_id, &application.volunteer_id)?
            .is_some()
        {
            return Err(StoreError::DuplicateKey(UniqueKey::JobVolunteer));
        }
        self.application_inserts.push(application.id.clone());
        self.applications
            .insert(application.id.clone(), Staged::Inserted(application));
        Ok(())
    }

    fn update_application(&mut self, application: Application) -> Result<(), StoreError> {
        if self.application(&application.id)?.is_none() {
            return Err(StoreError::not_found(
                EntityKind::Application,
                &application.id,
            ));
        }
        self.stage_application(application);
        Ok(())
    }

    fn delete_application(&mut self, id: &ApplicationId) -> Result<(), StoreError> {
        let Some(existing) = self.application(id)? else {
            return Err(StoreError::not_found(EntityKind::Application, id));
        };
        if matches!(self.applications.get(id), Some(Staged::Inserted(_))) {
            self.applications.remove(id);
            self.application_inserts.retain(|staged| staged != id);
        } else {
            self.applications
                .insert(id.clone(), Staged::Deleted(existing));
        }
        Ok(())
    }

    fn volunteer_stats(&mut self, volunteer_id: &UserId) -> Result<VolunteerStats, StoreError> {
        if let Some(stats) = self.volunteers.get(volunteer_id) {
            return Ok(stats.clone());
        }
        let tables = read_lock(self.tables)?;
        self.observe(&tables, RowKey::Volunteer(volunteer_id.clone()));
        Ok(tables
            .volunteers
            .get(volunteer_id)
            .cloned()
            .unwrap_or_else(|| VolunteerStats::new(volunteer_id.clone())))
    }

    fn put_volunteer_stats(&mut self, stats: VolunteerStats) -> Result<(), StoreError> {
        self.volunteers.insert(stats.volunteer_id.clone(), stats);
        Ok(())
    }
}
