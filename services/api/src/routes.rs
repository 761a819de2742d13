use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use serde_json::json;
use volunteer_match::error::AppError;
use volunteer_match::workflows::matching::{matching_router, MatchingError, UserId, UserProfile};

pub(crate) fn with_matching_routes(state: &AppState) -> axum::Router {
    matching_router(state.matching.clone())
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/users", axum::routing::post(register_user_endpoint))
        .route("/api/users/:user_id", axum::routing::get(user_profile_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Register a profile with the in-process directory. Credentials live elsewhere.
pub(crate) async fn register_user_endpoint(
    Extension(state): Extension<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<Response, AppError> {
    if profile.id.0.trim().is_empty() {
        let payload = json!({
            "error": "invalid_user",
            "message": "user id must not be empty",
        });
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response());
    }

    let registered = state
        .directory
        .register(profile.clone())
        .map_err(MatchingError::from)?;
    if !registered {
        let payload = json!({
            "error": "user_exists",
            "message": format!("user {} is already registered", profile.id),
        });
        return Ok((StatusCode::CONFLICT, Json(payload)).into_response());
    }

    tracing::info!(user_id = %profile.id, role = ?profile.role, "user registered");
    Ok((StatusCode::CREATED, Json(profile)).into_response())
}

pub(crate) async fn user_profile_endpoint(
    Extension(state): Extension<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let view = state.matching.profile(&UserId(user_id))?;
    Ok((StatusCode::OK, Json(view)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryUserDirectory;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;
    use volunteer_match::workflows::matching::{InMemoryStore, MatchingService};

    fn state() -> AppState {
        let directory = Arc::new(InMemoryUserDirectory::seeded().expect("seed directory"));
        let matching = Arc::new(MatchingService::new(
            Arc::new(InMemoryStore::new()),
            directory.clone(),
        ));
        AppState {
            readiness: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            directory,
            matching,
        }
    }

    fn app(state: &AppState) -> axum::Router {
        with_matching_routes(state).layer(Extension(state.clone()))
    }

    async fn call(router: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("encode")))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        router.clone().oneshot(request).await.expect("response")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn health_and_readiness_report_status() {
        let state = state();
        let router = app(&state);

        let response = call(&router, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");

        state
            .readiness
            .store(false, std::sync::atomic::Ordering::Relaxed);
        let response = call(&router, Method::GET, "/ready", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn users_register_once() {
        let state = state();
        let router = app(&state);
        let profile = json!({
            "id": "volunteer-nok",
            "role": "volunteer",
            "first_name": "Nok",
            "last_name": "Saetang",
            "phone": "+66 81 000 1111",
        });

        let response = call(&router, Method::POST, "/api/users", Some(profile.clone())).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = call(&router, Method::POST, "/api/users", Some(profile)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["error"], "user_exists");

        let response = call(&router, Method::GET, "/api/users/volunteer-nok", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let view = json_body(response).await;
        assert_eq!(view["first_name"], "Nok");
        assert_eq!(view["completed_jobs"], 0);
        assert_eq!(view["rating"], 0.0);
    }

    #[tokio::test]
    async fn unknown_user_profile_is_not_found() {
        let state = state();
        let router = app(&state);

        let response = call(&router, Method::GET, "/api/users/ghost", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "user_not_found");
    }

    #[tokio::test]
    async fn matching_routes_are_mounted() {
        let state = state();
        let router = app(&state);
        let payload = json!({
            "requester_id": "requester-ploy",
            "title": "Read mail aloud",
            "location": { "address": "Soi Ari 4", "latitude": 13.78, "longitude": 100.54 },
        });

        let response = call(&router, Method::POST, "/api/jobs", Some(payload)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["contact"]["name"], "Ploy Srisuk");

        let response = call(&router, Method::GET, "/api/jobs", None).await;
        let listed = json_body(response).await;
        assert_eq!(listed["jobs"].as_array().map(Vec::len), Some(1));
    }
}
