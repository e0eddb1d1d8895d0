use super::*;
use axum::http::StatusCode;
use serde_json::json;

#[test]
fn bulk_accepts_array() {
    assert!(validate_bulk(&json!([{"nome": "Ana"}, {"nome": "Rui"}])).is_ok());
}

#[test]
fn bulk_accepts_wrapped_array() {
    assert!(validate_bulk(&json!({"leads": [{"nome": "Ana"}]})).is_ok());
}

#[test]
fn bulk_rejects_empty_list() {
    let reply = validate_bulk(&json!([])).unwrap_err();
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body.error.as_deref(), Some("lista de leads vazia"));
}

#[test]
fn bulk_rejects_object_without_leads() {
    let reply = validate_bulk(&json!({"items": []})).unwrap_err();
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[test]
fn bulk_rejects_scalar_entries() {
    assert!(validate_bulk(&json!(["Ana", "Rui"])).is_err());
}

#[test]
fn bulk_rejects_scalar_body() {
    assert!(validate_bulk(&json!("Ana")).is_err());
}
