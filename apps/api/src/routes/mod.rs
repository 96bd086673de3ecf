pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::pipeline::handlers as pipeline;
use crate::reconcile::handlers as reconcile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs and their rounds
        .route(
            "/api/v1/jobs",
            get(pipeline::handle_list_jobs).post(pipeline::handle_create_job),
        )
        .route("/api/v1/jobs/:id/status", patch(pipeline::handle_toggle_job))
        .route("/api/v1/jobs/:id/rounds", put(pipeline::handle_replace_rounds))
        // Candidates
        .route("/api/v1/candidates", get(reconcile::handle_list_candidates))
        .route(
            "/api/v1/candidates/upload",
            post(reconcile::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/candidates/:id/linkedin",
            patch(reconcile::handle_update_profile_url),
        )
        // Resumes
        .route("/api/v1/resumes", get(reconcile::handle_list_resumes))
        .route("/api/v1/resumes/enrich-bulk", post(reconcile::handle_enrich_bulk))
        .route("/api/v1/resumes/:id/enrich", post(reconcile::handle_enrich))
        // Applications
        .route(
            "/api/v1/applications/:id/stage",
            patch(pipeline::handle_advance_stage),
        )
        .route(
            "/api/v1/applications/:id/status",
            patch(pipeline::handle_set_status),
        )
        .route(
            "/api/v1/applications/:id/scores",
            get(pipeline::handle_list_scores).post(pipeline::handle_add_score),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::store::MemoryStore;
    use crate::testing::{resume_data, test_state, FakeEnrichment};

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn app_with(fake: FakeEnrichment) -> Router {
        build_router(test_state(Arc::new(MemoryStore::new()), Arc::new(fake)))
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(FakeEnrichment::default());
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_job_then_list_from_cache() {
        let app = app_with(FakeEnrichment::default());

        let (status, created) = call(
            &app,
            Method::POST,
            "/api/v1/jobs",
            Some(json!({"title": "Backend Engineer"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["rounds"].as_array().unwrap().len(), 5);
        assert_eq!(created["status"], "open");

        let (status, jobs) = call(&app, Method::GET, "/api/v1/jobs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(jobs[0]["title"], "Backend Engineer");
        assert_eq!(jobs[0]["candidate_count"], 0);
    }

    #[tokio::test]
    async fn test_upload_then_guarded_round_delete() {
        let fake = FakeEnrichment {
            parsed: [("jane.pdf".to_string(), resume_data("Jane Doe", None))].into(),
            ..Default::default()
        };
        let app = app_with(fake);

        let (_, job) = call(
            &app,
            Method::POST,
            "/api/v1/jobs",
            Some(json!({"title": "Backend Engineer"})),
        )
        .await;
        let job_id = job["id"].as_str().unwrap().to_string();

        let boundary = "XBOUNDARY";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"job_offer_id\"\r\n\r\n{job_id}\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"jane.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n%PDF-1.4\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/candidates/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(summary["succeeded"].as_array().unwrap().len(), 1);

        let (_, candidates) = call(&app, Method::GET, "/api/v1/candidates", None).await;
        assert_eq!(candidates[0]["candidate"]["full_name"], "Jane Doe");
        assert_eq!(candidates[0]["status"], "applied");

        // Dropping the first round, where Jane sits, is refused.
        let rounds: Vec<Value> = job["rounds"].as_array().unwrap()[1..]
            .iter()
            .map(|r| json!({"id": r["id"], "name": r["name"], "order": r["stage_order"]}))
            .collect();
        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/api/v1/jobs/{job_id}/rounds"),
            Some(json!({ "rounds": rounds })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "STAGE_IN_USE");
    }

    fn multipart(boundary: &str, files: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                     Content-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    #[tokio::test]
    async fn test_upload_larger_than_default_body_limit() {
        let fake = FakeEnrichment {
            parsed: [
                ("jane.pdf".to_string(), resume_data("Jane Doe", Some("jane@x.com"))),
                ("john.pdf".to_string(), resume_data("John Roe", Some("john@x.com"))),
            ]
            .into(),
            ..Default::default()
        };
        let app = app_with(fake);

        let large = vec![b'a'; 1200 * 1024];
        let body = multipart(
            "XBOUNDARY",
            &[("jane.pdf", large.clone()), ("john.pdf", large)],
        );
        assert!(body.len() > 2 * 1024 * 1024);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/candidates/upload")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(summary["succeeded"].as_array().unwrap().len(), 2);
        assert!(summary["failed"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_application_is_not_found() {
        let app = app_with(FakeEnrichment::default());
        let (status, body) = call(
            &app,
            Method::PATCH,
            &format!("/api/v1/applications/{}/status", uuid::Uuid::new_v4()),
            Some(json!({"status": "declined"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
