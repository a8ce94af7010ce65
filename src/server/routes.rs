use std::{convert::Infallible, sync::Arc};

use tracing::{debug, error};
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reply::{self, Response},
    Filter, Rejection, Reply,
};

use crate::{error::ServiceError, utils::time::iso_timestamp};

use super::{
    protocol::{
        ErrorResponse, FailureResponse, LatestResponse, PartialSaveResponse, SaveRequest,
        SavedResponse,
    },
    service::{RelayService, SaveOutcome},
};

/// Captures arrive as base64 in JSON, full screen PNGs get large.
const MAX_BODY_BYTES: u64 = 50 * 1024 * 1024;

/// All routes of the relay service, including rejection handling.
pub fn routes(
    service: Arc<RelayService>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let screenshots = warp::path("screenshots")
        .and(warp::get())
        .and(warp::fs::dir(service.store().dir().to_path_buf()))
        .map(|file: warp::fs::File| file.into_response());

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(["GET", "POST"])
        .allow_header("content-type");

    save_route(service.clone())
        .or(latest_route(service))
        .unify()
        .or(screenshots)
        .unify()
        .with(cors)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn save_route(
    service: Arc<RelayService>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("save-screenshot")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_service(service))
        .then(handle_save)
}

fn latest_route(
    service: Arc<RelayService>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("latest-screenshot")
        .and(warp::get())
        .and(with_service(service))
        .map(|service: Arc<RelayService>| handle_latest(&service))
}

fn with_service(
    service: Arc<RelayService>,
) -> impl Filter<Extract = (Arc<RelayService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn handle_save(request: SaveRequest, service: Arc<RelayService>) -> Response {
    match service.save(request.base64_image).await {
        Ok(SaveOutcome::Persisted {
            timestamp,
            filename,
            path,
        }) => reply::json(&SavedResponse {
            success: true,
            message: "Screenshot saved successfully".into(),
            timestamp: iso_timestamp(timestamp),
            filename,
            file_path: path,
        })
        .into_response(),
        Ok(SaveOutcome::MemoryOnly { timestamp, error }) => reply::with_status(
            reply::json(&PartialSaveResponse {
                success: true,
                message: "Screenshot saved to memory but file save failed".into(),
                error,
                timestamp: iso_timestamp(timestamp),
            }),
            StatusCode::MULTI_STATUS,
        )
        .into_response(),
        Err(e) => error_reply(e),
    }
}

fn handle_latest(service: &RelayService) -> Response {
    match service.latest() {
        Ok(view) => reply::json(&LatestResponse {
            success: true,
            data: view.capture.data.to_string(),
            timestamp: iso_timestamp(view.capture.timestamp),
            filename: view.capture.filename.clone(),
            file_path: view.path,
        })
        .into_response(),
        Err(e) => error_reply(e),
    }
}

fn error_reply(error: ServiceError) -> Response {
    match error {
        ServiceError::Validation(message) => reply::with_status(
            reply::json(&ErrorResponse { error: message }),
            StatusCode::BAD_REQUEST,
        )
        .into_response(),
        ServiceError::NotFound(message) => failure(StatusCode::NOT_FOUND, message, None),
    }
}

fn failure(status: StatusCode, error: String, details: Option<String>) -> Response {
    reply::with_status(
        reply::json(&FailureResponse {
            success: false,
            error,
            details,
        }),
        status,
    )
    .into_response()
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    debug!("Request rejected {rejection:?}");
    let response = if rejection.is_not_found() {
        failure(StatusCode::NOT_FOUND, "Not found".into(), None)
    } else if let Some(e) = rejection.find::<BodyDeserializeError>() {
        reply::with_status(
            reply::json(&ErrorResponse {
                error: format!("Invalid request body: {e}"),
            }),
            StatusCode::BAD_REQUEST,
        )
        .into_response()
    } else if rejection.find::<warp::reject::LengthRequired>().is_some() {
        failure(
            StatusCode::LENGTH_REQUIRED,
            "Content-Length header is required".into(),
            None,
        )
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        failure(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".into(), None)
    } else if rejection.find::<warp::reject::UnsupportedMediaType>().is_some() {
        reply::with_status(
            reply::json(&ErrorResponse {
                error: "Expected a JSON body".into(),
            }),
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
        )
        .into_response()
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        failure(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".into(), None)
    } else if let Some(e) = rejection.find::<warp::cors::CorsForbidden>() {
        failure(StatusCode::FORBIDDEN, e.to_string(), None)
    } else {
        error!("Unhandled rejection {rejection:?}");
        failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to process request".into(),
            Some(format!("{rejection:?}")),
        )
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc};

    use anyhow::Result;
    use futures::future::join_all;
    use serde_json::{json, Value};
    use tempfile::{tempdir, NamedTempFile};
    use warp::{
        http::{Response, StatusCode},
        hyper::body::Bytes,
    };

    use crate::{
        server::{
            protocol::{LatestResponse, PartialSaveResponse, SavedResponse},
            service::RelayService,
        },
        storage::{
            capture_store::CaptureStore,
            encoding::{decode_payload, to_png_data_url},
        },
        utils::{clock::DefaultClock, logging::TEST_LOGGING},
    };

    use super::{handle_rejection, routes};

    fn service_in(dir: PathBuf) -> Arc<RelayService> {
        *TEST_LOGGING;
        Arc::new(RelayService::new(
            CaptureStore::new(dir),
            Box::new(DefaultClock),
        ))
    }

    async fn save(service: &Arc<RelayService>, body: Value) -> Response<Bytes> {
        warp::test::request()
            .method("POST")
            .path("/save-screenshot")
            .json(&body)
            .reply(&routes(service.clone()))
            .await
    }

    async fn get(service: &Arc<RelayService>, path: &str) -> Response<Bytes> {
        warp::test::request()
            .method("GET")
            .path(path)
            .reply(&routes(service.clone()))
            .await
    }

    async fn latest(service: &Arc<RelayService>) -> Response<Bytes> {
        get(service, "/latest-screenshot").await
    }

    #[tokio::test]
    async fn test_latest_before_any_save_is_404() -> Result<()> {
        let dir = tempdir()?;
        let service = service_in(dir.path().to_path_buf());

        let response = latest(&service).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_slice(response.body())?;
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_without_image_is_400() -> Result<()> {
        let dir = tempdir()?;
        let service = service_in(dir.path().to_path_buf());

        let response = save(&service, json!({})).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(response.body())?;
        assert_eq!(body["error"], json!("No image data provided"));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() -> Result<()> {
        let dir = tempdir()?;
        let service = service_in(dir.path().to_path_buf());

        let response = warp::test::request()
            .method("POST")
            .path("/save-screenshot")
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&routes(service))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_then_latest_and_static_file() -> Result<()> {
        let dir = tempdir()?;
        let service = service_in(dir.path().join("captures"));
        let payload = to_png_data_url(b"\x89PNG\r\n\x1a\nfake image");

        let response = save(&service, json!({ "base64Image": payload })).await;
        assert_eq!(response.status(), StatusCode::OK);
        let saved: SavedResponse = serde_json::from_slice(response.body())?;
        assert!(saved.success);
        assert!(saved.filename.starts_with("screenshot_"));
        assert!(saved.filename.ends_with(".png"));

        let response = latest(&service).await;
        assert_eq!(response.status(), StatusCode::OK);
        let current: LatestResponse = serde_json::from_slice(response.body())?;
        assert_eq!(current.data, payload);
        assert_eq!(current.timestamp, saved.timestamp);
        assert_eq!(current.filename.as_deref(), Some(saved.filename.as_str()));
        assert_eq!(current.file_path.as_ref(), Some(&saved.file_path));

        let response = get(&service, &format!("/screenshots/{}", saved.filename)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let on_disk = tokio::fs::read(&saved.file_path).await?;
        assert_eq!(response.body().as_ref(), on_disk.as_slice());
        assert_eq!(on_disk, decode_payload(&payload)?);
        Ok(())
    }

    #[tokio::test]
    async fn test_plain_base64_is_accepted() -> Result<()> {
        let dir = tempdir()?;
        let service = service_in(dir.path().to_path_buf());

        let response = save(&service, json!({ "base64Image": "aGVsbG8=" })).await;

        assert_eq!(response.status(), StatusCode::OK);
        let saved: SavedResponse = serde_json::from_slice(response.body())?;
        assert_eq!(tokio::fs::read(&saved.file_path).await?, b"hello");
        Ok(())
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_207() -> Result<()> {
        let blocker = NamedTempFile::new()?;
        let service = service_in(blocker.path().join("captures"));
        let payload = to_png_data_url(b"memory only");

        let response = save(&service, json!({ "base64Image": payload })).await;
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        let partial: PartialSaveResponse = serde_json::from_slice(response.body())?;
        assert!(partial.success);
        assert!(!partial.error.is_empty());

        let response = latest(&service).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body())?;
        assert_eq!(body["data"], json!(payload));
        assert_eq!(body["filePath"], Value::Null);
        assert_eq!(body["filename"], Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_saves_tolerate_existing_directory() -> Result<()> {
        let dir = tempdir()?;
        let service = service_in(dir.path().join("captures"));

        for content in [b"one".as_slice(), b"two".as_slice()] {
            let response =
                save(&service, json!({ "base64Image": to_png_data_url(content) })).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_saves_leave_a_complete_capture() -> Result<()> {
        let dir = tempdir()?;
        let service = service_in(dir.path().to_path_buf());
        let payloads = (0..8)
            .map(|i| to_png_data_url(format!("capture {i}").as_bytes()))
            .collect::<Vec<_>>();

        let responses = join_all(
            payloads
                .iter()
                .map(|payload| save(&service, json!({ "base64Image": payload }))),
        )
        .await;
        assert!(responses.iter().all(|v| v.status() == StatusCode::OK));

        let current: LatestResponse = serde_json::from_slice(latest(&service).await.body())?;
        assert!(payloads.contains(&current.data));
        let path = current.file_path.expect("latest capture should be on disk");
        assert_eq!(std::fs::read(path)?, decode_payload(&current.data)?);
        assert_eq!(std::fs::read_dir(dir.path())?.count(), payloads.len());

        // A save completing after both wins regardless of what happened before.
        let c = to_png_data_url(b"capture c");
        save(&service, json!({ "base64Image": c })).await;
        let current: LatestResponse = serde_json::from_slice(latest(&service).await.body())?;
        assert_eq!(current.data, c);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_static_file_is_404() -> Result<()> {
        let dir = tempdir()?;
        let service = service_in(dir.path().to_path_buf());

        let response = get(&service, "/screenshots/screenshot_1.png").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_without_content_length_is_411() -> Result<()> {
        let dir = tempdir()?;
        let service = service_in(dir.path().to_path_buf());

        let response = warp::test::request()
            .method("POST")
            .path("/save-screenshot")
            .header("content-type", "application/json")
            .reply(&routes(service))
            .await;

        assert_eq!(response.status(), StatusCode::LENGTH_REQUIRED);
        let body: Value = serde_json::from_slice(response.body())?;
        assert_eq!(body["success"], false);
        Ok(())
    }

    #[derive(Debug)]
    struct Unexpected;

    impl warp::reject::Reject for Unexpected {}

    #[tokio::test]
    async fn test_unexpected_rejection_is_500_with_details() -> Result<()> {
        let response = handle_rejection(warp::reject::custom(Unexpected))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = warp::hyper::body::to_bytes(response.into_body()).await?;
        let body: Value = serde_json::from_slice(&body)?;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Failed to process request");
        assert!(body["details"].as_str().unwrap().contains("Unexpected"));
        Ok(())
    }
}
