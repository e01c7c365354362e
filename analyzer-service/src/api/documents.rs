//! Document endpoints: multipart upload and status polling.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};

use crate::error::{ServiceError, ServiceResult};
use crate::models::DocumentStatus;

use super::AppState;

/// Accept a document upload and start processing it.
///
/// Validation (extension, size) happens synchronously; the pipeline runs in
/// the background. The response is the initial status snapshot with the
/// generated document id.
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ServiceResult<Json<DocumentStatus>> {
    let mut file_data: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidRequest {
            message: e.body_text(),
        })?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("document").to_string();
            let max = state.service.config.limits.max_document_size_bytes;
            let data = field.bytes().await.map_err(|e| {
                // A body-limit overrun surfaces here as a length-limit error.
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    ServiceError::FileTooLarge { max }
                } else {
                    ServiceError::InvalidRequest {
                        message: e.body_text(),
                    }
                }
            })?;
            file_data = Some((data.to_vec(), filename));
        }
    }

    let (data, filename) = file_data.ok_or_else(|| ServiceError::InvalidRequest {
        message: "No file provided".to_string(),
    })?;

    let snapshot = state.service.submit_document(data, filename)?;
    Ok(Json(snapshot))
}

/// Current status of a document, or 404 for an id never submitted.
pub async fn get_document_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ServiceResult<Json<DocumentStatus>> {
    let status = state
        .service
        .status
        .get(&id)
        .ok_or(ServiceError::DocumentNotFound { document_id: id })?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::analysis::SimulatedAnalysisBackend;
    use crate::config::{AnalysisSimConfig, StaticConfig};
    use crate::service::AnalyzerService;

    fn router_with(config: StaticConfig) -> (axum::Router, Arc<AnalyzerService>) {
        let config = Arc::new(StaticConfig {
            analysis: AnalysisSimConfig::deterministic(),
            ..config
        });
        let backend = Arc::new(SimulatedAnalysisBackend::new(config.analysis.clone()));
        let service = Arc::new(AnalyzerService::new(config, backend));
        (crate::api::router(service.clone()), service)
    }

    fn test_router() -> (axum::Router, Arc<AnalyzerService>) {
        router_with(StaticConfig::default())
    }

    fn router_with_size_limit(max_bytes: u64) -> (axum::Router, Arc<AnalyzerService>) {
        router_with(StaticConfig {
            limits: crate::config::LimitsConfig {
                max_document_size_bytes: max_bytes,
                ..Default::default()
            },
            ..StaticConfig::default()
        })
    }

    fn multipart_body(filename: &str, content: &[u8]) -> (String, Vec<u8>) {
        let boundary = "test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    #[tokio::test]
    async fn test_upload_returns_initial_status() {
        let (router, service) = test_router();
        let (content_type, body) = multipart_body("report.txt", b"quarterly report body");

        let response = router
            .oneshot(
                Request::post("/api/documents")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: DocumentStatus = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(status.status, "processing");
        assert_eq!(status.progress, 0.0);
        assert_eq!(status.filename, "report.txt");

        if let Some(handle) = service.take_job_handle(&status.document_id) {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_upload_without_file_is_bad_request() {
        let (router, _service) = test_router();

        let boundary = "test-boundary";
        let body = format!("--{boundary}--\r\n");
        let response = router
            .oneshot(
                Request::post("/api/documents")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_unsupported_extension() {
        let (router, _service) = test_router();
        let (content_type, body) = multipart_body("payload.exe", b"binary");

        let response = router
            .oneshot(
                Request::post("/api/documents")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_upload_at_exact_size_limit_is_accepted() {
        let (router, service) = router_with_size_limit(100);
        let (content_type, body) = multipart_body("limit.txt", &[b'a'; 100]);

        let response = router
            .oneshot(
                Request::post("/api/documents")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: DocumentStatus = serde_json::from_slice(&bytes).unwrap();
        if let Some(handle) = service.take_job_handle(&status.document_id) {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_upload_above_size_limit_is_payload_too_large() {
        let (router, _service) = router_with_size_limit(100);
        let (content_type, body) = multipart_body("big.txt", &[b'a'; 150]);

        let response = router
            .oneshot(
                Request::post("/api/documents")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(error["code"], "file_too_large");
    }

    #[tokio::test]
    async fn test_malformed_multipart_reports_parse_error() {
        let (router, _service) = test_router();

        // A body with no boundary at all never terminates cleanly.
        let response = router
            .oneshot(
                Request::post("/api/documents")
                    .header(
                        header::CONTENT_TYPE,
                        "multipart/form-data; boundary=test-boundary",
                    )
                    .body(Body::from("this is not multipart data"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let message = error["message"].as_str().unwrap();
        assert!(!message.contains("No file provided"), "got: {message}");
    }

    #[tokio::test]
    async fn test_status_for_unknown_id_is_not_found() {
        let (router, _service) = test_router();

        let response = router
            .oneshot(
                Request::get("/api/documents/never-submitted")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_reflects_completed_job() {
        let (router, service) = test_router();
        let snapshot = service
            .submit_document(b"content for polling".to_vec(), "poll.txt".to_string())
            .unwrap();
        if let Some(handle) = service.take_job_handle(&snapshot.document_id) {
            handle.await.unwrap();
        }

        let response = router
            .oneshot(
                Request::get(format!("/api/documents/{}", snapshot.document_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: DocumentStatus = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(status.status, "complete");
        assert_eq!(status.progress, 1.0);
        let result = status.result.unwrap();
        assert!(result.word_count > 0);
        assert!(!result.key_insights.is_empty());
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (router, _service) = test_router();
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
