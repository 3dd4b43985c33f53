use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crmserver::core::error::AppError;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

#[tokio::test]
async fn validation_error_carries_field_details() {
    let response =
        AppError::validation_field("Due date cannot be in the past", "due_date").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "Due date cannot be in the past");
    assert_eq!(body["details"]["field"], "due_date");
    assert!(body.get("error_id").is_none());
}

#[tokio::test]
async fn not_found_names_the_resource_but_never_the_tenant() {
    let id = Uuid::new_v4();
    let response = AppError::not_found("Deal", id).into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error_code"], "NOT_FOUND");
    assert_eq!(body["details"]["resource"], "Deal");
    assert_eq!(body["details"]["identifier"], id.to_string());
}

#[tokio::test]
async fn authorization_error_is_a_generic_forbidden() {
    let response =
        AppError::authorization("You don't have permission to modify this deal").into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["error_code"], "AUTHORIZATION_FAILED");
}

#[tokio::test]
async fn conflict_error_envelope() {
    let response = AppError::conflict("Cannot delete contact with 2 referencing deal(s)")
        .into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["error_code"], "CONFLICT");
}

#[tokio::test]
async fn storage_failures_yield_a_correlation_id_and_no_detail() {
    let response =
        AppError::Database(diesel::result::Error::BrokenTransactionManager).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error_code"], "DATABASE_ERROR");
    assert_eq!(body["message"], "An internal server error occurred");
    let error_id = body["error_id"].as_str().expect("Missing error_id");
    assert!(Uuid::parse_str(error_id).is_ok());
}
