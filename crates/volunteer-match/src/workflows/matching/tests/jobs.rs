use std::sync::Arc;

use chrono::NaiveDate;

use super::common::*;

use crate::workflows::matching::{
    ApplicationStatus, ErrorKind, InMemoryStore, JobId, JobPatch, JobStatus, MatchingError,
    MatchingService, Requirements, Schedule, UserId, UserProfile, UserRole,
};

#[test]
fn create_opens_job_with_contact_snapshot() {
    let (service, _) = build_service();
    let job = posted_job(&service);

    assert_eq!(job.status, JobStatus::Open);
    assert_eq!(job.accepted_volunteer_id, None);
    assert_eq!(job.distance_km, 0.0);
    assert_eq!(job.requester_rating, None);
    assert_eq!(job.contact.name, "Somchai Prasert");
    assert_eq!(job.contact.phone, "+66 81 234 5678");
    assert_eq!(job.requirements.len(), 2);
    assert!(job.is_consistent());
}

#[test]
fn create_requires_known_requester() {
    let (service, _) = build_service();
    let err = service
        .create_job(&UserId::new("stranger"), new_job("Pharmacy visit"))
        .expect_err("unknown requester");

    assert!(matches!(err, MatchingError::UserNotFound(_)));
    assert!(service.jobs().list().expect("list").is_empty());
}

#[test]
fn directory_outage_is_a_storage_failure() {
    let store = Arc::new(InMemoryStore::new());
    let service = MatchingService::new(store, Arc::new(UnavailableDirectory));

    let err = service
        .create_job(&requester(), new_job("Pharmacy visit"))
        .expect_err("directory down");
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    assert!(!err.public_message().contains("timed out"));
}

#[test]
fn complete_credits_the_bound_volunteer_once() {
    let (service, store) = build_service();
    let (job, accepted) = assigned_job(&service);

    let completed = service
        .complete_job(&job.id, &volunteer(1))
        .expect("complete");
    assert_eq!(completed.status, JobStatus::Completed);
    assert_eq!(completed.accepted_volunteer_id, Some(volunteer(1)));
    assert!(completed.is_consistent());

    let stats = service.volunteer_stats(&volunteer(1)).expect("stats");
    assert_eq!(stats.completed_jobs, 1);

    let application = service
        .applications()
        .find(&job.id, &volunteer(1))
        .expect("find")
        .expect("accepted application");
    assert_eq!(application.status, ApplicationStatus::Accepted);
    assert!(application.updated_at >= accepted.updated_at);

    let err = service
        .complete_job(&job.id, &volunteer(1))
        .expect_err("already completed");
    assert!(matches!(err, MatchingError::JobNotAssigned(_)));
    assert_eq!(
        service
            .volunteer_stats(&volunteer(1))
            .expect("stats")
            .completed_jobs,
        1
    );
    assert_eq!(stored_job(&store, &job.id).status, JobStatus::Completed);
}

#[test]
fn complete_by_other_volunteer_changes_nothing() {
    let (service, store) = build_service();
    let (job, _) = assigned_job(&service);

    let err = service
        .complete_job(&job.id, &volunteer(2))
        .expect_err("mismatched volunteer");
    assert!(matches!(err, MatchingError::JobNotAssigned(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    assert_eq!(stored_job(&store, &job.id), job);
    assert_eq!(
        service
            .volunteer_stats(&volunteer(2))
            .expect("stats")
            .completed_jobs,
        0
    );
}

#[test]
fn complete_of_open_job_is_refused() {
    let (service, _) = build_service();
    let job = posted_job(&service);
    let err = service
        .complete_job(&job.id, &volunteer(1))
        .expect_err("not assigned");
    assert!(matches!(err, MatchingError::JobNotAssigned(_)));
}

#[test]
fn cancel_only_from_open() {
    let (service, _) = build_service();
    let open = posted_job(&service);
    let cancelled = service.cancel_job(&open.id).expect("cancel");
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(cancelled.is_consistent());

    let err = service.cancel_job(&open.id).expect_err("already cancelled");
    assert!(matches!(err, MatchingError::JobNotOpen(_)));

    let (assigned, _) = assigned_job(&service);
    let err = service
        .cancel_job(&assigned.id)
        .expect_err("assigned jobs stay");
    assert!(matches!(err, MatchingError::JobNotOpen(_)));
    assert_eq!(
        service.jobs().get(&assigned.id).expect("job").status,
        JobStatus::Assigned
    );
}

#[test]
fn update_patches_descriptive_fields_only() {
    let (service, _) = build_service();
    let (job, _) = assigned_job(&service);

    let patch = JobPatch {
        title: Some("Pharmacy and post office".to_string()),
        meeting_point: Some("Gate 3".to_string()),
        schedule: Some(Schedule {
            work_date: NaiveDate::from_ymd_opt(2025, 11, 2),
            ..Schedule::default()
        }),
        requirements: Some(Requirements::new(["Thai speaker"])),
        ..JobPatch::default()
    };
    let updated = service.update_job(&job.id, patch).expect("update");

    assert_eq!(updated.title, "Pharmacy and post office");
    assert_eq!(updated.location.meeting_point, "Gate 3");
    assert_eq!(updated.location.address, job.location.address);
    assert_eq!(updated.schedule.work_date, NaiveDate::from_ymd_opt(2025, 11, 2));
    assert_eq!(updated.requirements.as_slice(), ["Thai speaker".to_string()]);
    assert_eq!(updated.status, JobStatus::Assigned);
    assert_eq!(updated.accepted_volunteer_id, Some(volunteer(1)));
}

#[test]
fn finalized_jobs_cannot_be_edited() {
    let (service, _) = build_service();
    let job = completed_job(&service);

    let err = service
        .update_job(
            &job.id,
            JobPatch {
                title: Some("Renamed".to_string()),
                ..JobPatch::default()
            },
        )
        .expect_err("completed");
    assert!(matches!(err, MatchingError::JobFinalized(_)));
}

#[test]
fn listings_are_newest_first() {
    let (service, _) = build_service();
    let first = posted_job(&service);
    let second = service
        .create_job(&requester(), new_job("Market trip"))
        .expect("second");

    let ids: Vec<JobId> = service
        .jobs()
        .list()
        .expect("list")
        .into_iter()
        .map(|job| job.id)
        .collect();
    assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

    let mine: Vec<JobId> = service
        .jobs()
        .list_for_requester(&requester())
        .expect("list")
        .into_iter()
        .map(|job| job.id)
        .collect();
    assert_eq!(mine, vec![second.id, first.id]);
    assert!(service
        .jobs()
        .list_for_requester(&volunteer(1))
        .expect("list")
        .is_empty());
}

#[test]
fn job_view_reports_viewer_application_status() {
    let (service, _) = build_service();
    let job = posted_job(&service);
    service.apply(&job.id, &volunteer(1)).expect("apply");

    let view = service
        .job_view(&job.id, Some(&volunteer(1)))
        .expect("view");
    assert_eq!(view.application_status, Some(ApplicationStatus::Pending));
    assert_eq!(view.requester_disability_type.as_deref(), Some("visual"));

    let stranger = service
        .job_view(&job.id, Some(&volunteer(3)))
        .expect("view");
    assert_eq!(stranger.application_status, None);

    let listed = service.list_jobs(Some(&volunteer(1))).expect("list");
    assert_eq!(listed[0].application_status, Some(ApplicationStatus::Pending));
}

#[test]
fn job_list_carries_each_requester_disability_type() {
    let directory = directory();
    directory.register(UserProfile {
        id: UserId::new("requester-2"),
        role: UserRole::Requester,
        first_name: "Pim".to_string(),
        last_name: "Rattana".to_string(),
        phone: "+66 81 765 4321".to_string(),
        disability_type: None,
    });
    let service = MatchingService::new(Arc::new(InMemoryStore::new()), Arc::new(directory));
    let visual = service
        .create_job(&requester(), new_job("Pharmacy visit"))
        .expect("first requester posts");
    let unspecified = service
        .create_job(&UserId::new("requester-2"), new_job("Post office"))
        .expect("second requester posts");
    let again = service
        .create_job(&requester(), new_job("Market trip"))
        .expect("first requester posts again");

    let listed = service.list_jobs(None).expect("list");
    let by_job: Vec<(JobId, Option<&str>)> = listed
        .iter()
        .map(|view| (view.job.id.clone(), view.requester_disability_type.as_deref()))
        .collect();
    assert_eq!(
        by_job,
        vec![
            (again.id, Some("visual")),
            (unspecified.id, None),
            (visual.id, Some("visual")),
        ]
    );
    assert!(listed.iter().all(|view| view.application_status.is_none()));
}

#[test]
fn requester_jobs_name_the_accepted_volunteer() {
    let (service, _) = build_service();
    let (job, _) = assigned_job(&service);

    let views = service.requester_jobs(&requester()).expect("views");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].job.id, job.id);
    assert_eq!(
        views[0].accepted_volunteer_name.as_deref(),
        Some("Anong Volunteer")
    );
}
