use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::directory::UserDirectory;
use super::domain::{ApplicationId, ApplicationStatus, JobId, JobPatch, NewJob, UserId};
use super::error::{ErrorKind, MatchingError};
use super::service::MatchingService;
use super::store::EntityStore;

type SharedService<S, D> = State<Arc<MatchingService<S, D>>>;

/// Router builder exposing the job, application, and rating endpoints.
pub fn matching_router<S, D>(service: Arc<MatchingService<S, D>>) -> Router
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    Router::new()
        .route(
            "/api/jobs",
            post(create_job_handler::<S, D>).get(list_jobs_handler::<S, D>),
        )
        .route(
            "/api/jobs/:job_id",
            get(job_handler::<S, D>)
                .put(update_job_handler::<S, D>)
                .delete(cancel_job_handler::<S, D>),
        )
        .route(
            "/api/requesters/:requester_id/jobs",
            get(requester_jobs_handler::<S, D>),
        )
        .route("/api/jobs/:job_id/apply", post(apply_handler::<S, D>))
        .route(
            "/api/jobs/:job_id/cancel",
            post(cancel_application_handler::<S, D>),
        )
        .route(
            "/api/jobs/:job_id/applications",
            get(job_applications_handler::<S, D>),
        )
        .route(
            "/api/applications/:application_id/accept",
            post(accept_handler::<S, D>),
        )
        .route(
            "/api/applications/:application_id/reject",
            post(reject_handler::<S, D>),
        )
        .route(
            "/api/volunteers/:volunteer_id/applications",
            get(volunteer_applications_handler::<S, D>),
        )
        .route("/api/jobs/:job_id/complete", post(complete_handler::<S, D>))
        .route("/api/jobs/:job_id/rating", post(rate_handler::<S, D>))
        .route(
            "/api/volunteers/:volunteer_id/reviews",
            get(reviews_handler::<S, D>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub requester_id: UserId,
    #[serde(flatten)]
    pub job: NewJob,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewerQuery {
    pub volunteer_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct VolunteerRequest {
    pub volunteer_id: UserId,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i64,
    #[serde(default)]
    pub review: Option<String>,
}

/// Render a lifecycle failure as `{"error": code, "message": text}`.
pub(crate) fn error_response(err: MatchingError) -> Response {
    let kind = err.kind();
    if kind == ErrorKind::StorageFailure {
        error!(error = %err, code = err.code(), "matching request failed in storage");
    }
    let payload = json!({
        "error": err.code(),
        "message": err.public_message(),
    });
    (kind.status(), axum::Json(payload)).into_response()
}

pub(crate) async fn create_job_handler<S, D>(
    State(service): SharedService<S, D>,
    axum::Json(request): axum::Json<CreateJobRequest>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.create_job(&request.requester_id, request.job) {
        Ok(job) => (StatusCode::CREATED, axum::Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_jobs_handler<S, D>(
    State(service): SharedService<S, D>,
    Query(query): Query<ViewerQuery>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.list_jobs(query.volunteer_id.as_ref()) {
        Ok(jobs) => (StatusCode::OK, axum::Json(json!({ "jobs": jobs }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn job_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(job_id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.job_view(&JobId(job_id), query.volunteer_id.as_ref()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_job_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(job_id): Path<String>,
    axum::Json(patch): axum::Json<JobPatch>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.update_job(&JobId(job_id), patch) {
        Ok(job) => (StatusCode::OK, axum::Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cancel_job_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(job_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.cancel_job(&JobId(job_id)) {
        Ok(job) => (StatusCode::OK, axum::Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn requester_jobs_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(requester_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.requester_jobs(&UserId(requester_id)) {
        Ok(jobs) => (StatusCode::OK, axum::Json(json!({ "jobs": jobs }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn apply_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<VolunteerRequest>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.apply(&JobId(job_id), &request.volunteer_id) {
        Ok(application) => (StatusCode::CREATED, axum::Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cancel_application_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<VolunteerRequest>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.cancel_application(&JobId(job_id), &request.volunteer_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn job_applications_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(job_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.job_applications(&JobId(job_id), query.status) {
        Ok(applications) => (
            StatusCode::OK,
            axum::Json(json!({ "applications": applications })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn accept_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(application_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.accept(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reject_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(application_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.reject(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn volunteer_applications_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(volunteer_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.volunteer_applications(&UserId(volunteer_id)) {
        Ok(items) => (StatusCode::OK, axum::Json(json!({ "items": items }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn complete_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<VolunteerRequest>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.complete_job(&JobId(job_id), &request.volunteer_id) {
        Ok(job) => (StatusCode::OK, axum::Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn rate_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<RatingRequest>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.rate(&JobId(job_id), request.rating, request.review) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reviews_handler<S, D>(
    State(service): SharedService<S, D>,
    Path(volunteer_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    D: UserDirectory + 'static,
{
    match service.reviews(&UserId(volunteer_id)) {
        Ok(reviews) => (StatusCode::OK, axum::Json(json!({ "reviews": reviews }))).into_response(),
        Err(err) => error_response(err),
    }
}
