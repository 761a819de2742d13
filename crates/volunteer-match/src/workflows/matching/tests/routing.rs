use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;

use crate::workflows::matching::router::{accept_handler, job_handler, ViewerQuery};
use crate::workflows::matching::MatchingService;

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    router.clone().oneshot(request).await.expect("router responds")
}

fn job_payload() -> Value {
    json!({
        "requester_id": "requester-1",
        "title": "Pharmacy visit",
        "description": "Guide to the outpatient pharmacy and back",
        "location": {
            "address": "Chulalongkorn Hospital, Bangkok",
            "latitude": 13.7326,
            "longitude": 100.5359,
        },
        "schedule": { "work_date": "2025-11-02", "start_time": "09:30", "end_time": "" },
        "requirements": ["Thai speaker"],
    })
}

#[tokio::test]
async fn lifecycle_round_trip_over_http() {
    let (service, _) = build_service();
    let router = router_for(service);

    let response = send(&router, Method::POST, "/api/jobs", Some(job_payload())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let job = read_json_body(response).await;
    let job_id = job["id"].as_str().expect("job id").to_string();
    assert_eq!(job["status"], "open");
    assert_eq!(job["schedule"]["start_time"], "09:30:00");
    assert!(job["schedule"].get("end_time").is_none());
    assert_eq!(job["contact"]["name"], "Somchai Prasert");

    let apply_uri = format!("/api/jobs/{job_id}/apply");
    let response = send(
        &router,
        Method::POST,
        &apply_uri,
        Some(json!({ "volunteer_id": "volunteer-1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let application = read_json_body(response).await;
    assert_eq!(application["status"], "pending");
    let application_id = application["id"].as_str().expect("application id").to_string();

    let response = send(
        &router,
        Method::POST,
        &apply_uri,
        Some(json!({ "volunteer_id": "volunteer-1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(read_json_body(response).await["error"], "already_applied");

    let response = send(
        &router,
        Method::POST,
        &format!("/api/applications/{application_id}/accept"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["status"], "accepted");

    let response = send(
        &router,
        Method::GET,
        &format!("/api/jobs/{job_id}?volunteer_id=volunteer-1"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let view = read_json_body(response).await;
    assert_eq!(view["status"], "assigned");
    assert_eq!(view["accepted_volunteer_id"], "volunteer-1");
    assert_eq!(view["application_status"], "accepted");
    assert_eq!(view["accepted_volunteer_name"], "Anong Volunteer");

    let response = send(
        &router,
        Method::POST,
        &format!("/api/jobs/{job_id}/complete"),
        Some(json!({ "volunteer_id": "volunteer-1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["status"], "completed");

    let rating_uri = format!("/api/jobs/{job_id}/rating");
    let response = send(
        &router,
        Method::POST,
        &rating_uri,
        Some(json!({ "rating": 7 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json_body(response).await["error"], "invalid_rating");

    let response = send(
        &router,
        Method::POST,
        &rating_uri,
        Some(json!({ "rating": 4, "review": "On time and kind" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = read_json_body(response).await;
    assert_eq!(outcome["job"]["requester_rating"], 4);
    assert_eq!(outcome["volunteer"]["rating"], 4.0);
    assert_eq!(outcome["volunteer"]["completed_jobs"], 1);

    let response = send(
        &router,
        Method::POST,
        &rating_uri,
        Some(json!({ "rating": 5 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "already_rated");
    assert!(payload["message"].as_str().expect("message").contains(&job_id));

    let response = send(&router, Method::GET, "/api/volunteers/volunteer-1/reviews", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let reviews = read_json_body(response).await;
    assert_eq!(reviews["reviews"][0]["review"], "On time and kind");
}

#[tokio::test]
async fn application_listings_filter_and_cancel() {
    let (service, _) = build_service();
    let job = posted_job(&service);
    service.apply(&job.id, &volunteer(1)).expect("apply 1");
    let second = service.apply(&job.id, &volunteer(2)).expect("apply 2");
    service.reject(&second.id).expect("reject");
    let router = router_for(service);

    let response = send(
        &router,
        Method::GET,
        &format!("/api/jobs/{}/applications?status=pending", job.id),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json_body(response).await;
    let applications = listed["applications"].as_array().expect("array");
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0]["volunteer_id"], "volunteer-1");
    assert_eq!(applications[0]["volunteer_name"], "Anong Volunteer");

    let response = send(
        &router,
        Method::POST,
        &format!("/api/jobs/{}/cancel", job.id),
        Some(json!({ "volunteer_id": "volunteer-1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &router,
        Method::POST,
        &format!("/api/jobs/{}/cancel", job.id),
        Some(json!({ "volunteer_id": "volunteer-2" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json_body(response).await["error"], "cannot_cancel");

    let response = send(
        &router,
        Method::GET,
        "/api/volunteers/volunteer-2/applications",
        None,
    )
    .await;
    let items = read_json_body(response).await;
    assert_eq!(items["items"][0]["status"], "rejected");
    assert_eq!(items["items"][0]["job"]["requester_disability_type"], "visual");
}

#[tokio::test]
async fn job_edits_and_cancellation_over_http() {
    let (service, _) = build_service();
    let job = posted_job(&service);
    let router = router_for(service);
    let job_uri = format!("/api/jobs/{}", job.id);

    let response = send(
        &router,
        Method::PUT,
        &job_uri,
        Some(json!({ "title": "Pharmacy and bank", "requirements": ["Patient"] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json_body(response).await;
    assert_eq!(updated["title"], "Pharmacy and bank");
    assert_eq!(updated["requirements"], json!(["Patient"]));

    let response = send(&router, Method::DELETE, &job_uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["status"], "cancelled");

    let response = send(
        &router,
        Method::PUT,
        &job_uri,
        Some(json!({ "title": "Too late" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json_body(response).await["error"], "job_finalized");

    let response = send(&router, Method::GET, "/api/requesters/requester-1/jobs", None).await;
    let listed = read_json_body(response).await;
    assert_eq!(listed["jobs"][0]["status"], "cancelled");
}

#[tokio::test]
async fn unknown_entities_are_not_found() {
    let (service, _) = build_service();
    let router = router_for(service);

    let response = send(&router, Method::GET, "/api/jobs/nope", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json_body(response).await["error"], "job_not_found");

    let response = send(&router, Method::POST, "/api/applications/nope/reject", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json_body(response).await["error"], "application_not_found");

    let mut payload = job_payload();
    payload["requester_id"] = json!("stranger");
    let response = send(&router, Method::POST, "/api/jobs", Some(payload)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json_body(response).await["error"], "user_not_found");
}

#[tokio::test]
async fn storage_failure_hides_internal_detail() {
    let service = Arc::new(MatchingService::new(
        Arc::new(UnavailableStore),
        Arc::new(directory()),
    ));

    let response = accept_handler::<UnavailableStore, MemoryDirectory>(
        State(service.clone()),
        Path("app-1".to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "storage_failure");
    assert!(!payload["message"]
        .as_str()
        .expect("message")
        .contains("10.0.0.7"));

    let response = job_handler::<UnavailableStore, MemoryDirectory>(
        State(service),
        Path("job-1".to_string()),
        axum::extract::Query(ViewerQuery::default()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
