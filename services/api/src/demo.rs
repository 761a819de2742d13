use crate::infra::{demo_requester, demo_volunteers, InMemoryUserDirectory};
use chrono::{Duration, Local};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use volunteer_match::config::StoreConfig;
use volunteer_match::error::AppError;
use volunteer_match::workflows::matching::{
    ApplicationStatus, InMemoryStore, Location, MatchingError, MatchingService, NewJob,
    Requirements, Schedule,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Score the requester gives the volunteer (1-5)
    #[arg(long, default_value_t = 5)]
    pub(crate) rating: i64,
    /// Optional written review attached to the rating
    #[arg(long)]
    pub(crate) review: Option<String>,
    /// Persist the demo run to this snapshot file
    #[arg(long)]
    pub(crate) store_path: Option<PathBuf>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = InMemoryStore::open(&StoreConfig {
        snapshot_path: args.store_path,
        ..StoreConfig::default()
    })?;
    let directory = Arc::new(InMemoryUserDirectory::seeded().map_err(MatchingError::from)?);
    let service = MatchingService::new(Arc::new(store), directory);
    let requester = demo_requester();
    let [arthit, mali] = demo_volunteers();

    println!("Volunteer matching demo");

    let job = service.create_job(
        &requester,
        NewJob {
            title: "Accompany to eye clinic".to_string(),
            description: "Meet at the BTS exit and guide to the third-floor clinic".to_string(),
            location: Location {
                address: "Rutnin Eye Hospital, Sukhumvit 21".to_string(),
                meeting_point: "BTS Asok exit 3".to_string(),
                latitude: 13.7387,
                longitude: 100.5606,
            },
            schedule: Schedule {
                work_date: Some(Local::now().date_naive() + Duration::days(2)),
                ..Schedule::default()
            },
            requirements: Requirements::new(["Sighted guide experience", "Thai speaker"]),
        },
    )?;
    println!(
        "  Posted job {} '{}' for {} ({})",
        job.id,
        job.title,
        job.contact.name,
        job.status.label()
    );
    if !job.requirements.is_empty() {
        println!("  Requirements: {}", job.requirements.as_slice().join(", "));
    }

    let first = service.apply(&job.id, &arthit)?;
    let second = service.apply(&job.id, &mali)?;
    println!("\nApplications");
    for view in service.job_applications(&job.id, Some(ApplicationStatus::Pending))? {
        println!(
            "  {} from {} ({})",
            view.application.id,
            view.volunteer_name.as_deref().unwrap_or("unknown volunteer"),
            view.application.status.label()
        );
    }

    if let Err(err) = service.apply(&job.id, &arthit) {
        println!("  Re-applying is refused: {} [{}]", err, err.code());
    }

    let accepted = service.accept(&first.id)?;
    println!("\nAccepted {} for volunteer {}", accepted.id, accepted.volunteer_id);
    for view in service.job_applications(&job.id, None)? {
        println!(
            "  {} -> {}",
            view.volunteer_name.as_deref().unwrap_or("unknown volunteer"),
            view.application.status.label()
        );
    }
    if let Err(err) = service.accept(&second.id) {
        println!("  Second accept is refused: {} [{}]", err, err.code());
    }

    let completed = service.complete_job(&job.id, &arthit)?;
    println!("\nJob {} is now {}", completed.id, completed.status.label());

    let outcome = service.rate(&job.id, args.rating, args.review)?;
    println!(
        "Rated {}/5; volunteer {} now averages {:.2} over {} completed job(s)",
        args.rating,
        outcome.volunteer.volunteer_id,
        outcome.volunteer.rating,
        outcome.volunteer.completed_jobs
    );

    for review in service.reviews(&arthit)? {
        println!(
            "  Review on '{}': {}/5{}",
            review.job_title,
            review.rating,
            review
                .review
                .map(|text| format!(" \"{text}\""))
                .unwrap_or_default()
        );
    }

    Ok(())
}
