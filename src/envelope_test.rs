use super::*;
use serde_json::json;

#[test]
fn ok_envelope_skips_empty_fields() {
    let env: Envelope = Envelope::ok(Some(json!({"id": 1})), None);
    let value = serde_json::to_value(&env).unwrap();
    assert_eq!(value, json!({"success": true, "data": {"id": 1}}));
}

#[test]
fn failure_envelope_carries_message_and_error() {
    let env: Envelope = Envelope::failure("Erro ao listar leads", "timeout");
    let value = serde_json::to_value(&env).unwrap();
    assert_eq!(value, json!({"success": false, "message": "Erro ao listar leads", "error": "timeout"}));
}

#[test]
fn envelope_deserializes_without_optional_fields() {
    let env: Envelope = serde_json::from_str(r#"{"success":false}"#).unwrap();
    assert!(!env.success);
    assert!(env.data.is_none());
    assert!(env.message.is_none());
}

// =============================================================================
// extract_message
// =============================================================================

#[test]
fn extract_prefers_message_field() {
    let body = json!({"message": "Lead duplicado", "error": "conflict"});
    assert_eq!(extract_message(&body).as_deref(), Some("Lead duplicado"));
}

#[test]
fn extract_falls_through_blank_message() {
    let body = json!({"message": "  ", "erro": "telefone inválido"});
    assert_eq!(extract_message(&body).as_deref(), Some("telefone inválido"));
}

#[test]
fn extract_reads_string_detail() {
    let body = json!({"detail": "Not Found"});
    assert_eq!(extract_message(&body).as_deref(), Some("Not Found"));
}

#[test]
fn extract_joins_validation_detail_list() {
    let body = json!({"detail": [{"loc": ["body", "nome"], "msg": "field required"}, {"msg": "bad phone"}]});
    assert_eq!(extract_message(&body).as_deref(), Some("field required; bad phone"));
}

#[test]
fn extract_from_plain_string_body() {
    assert_eq!(extract_message(&json!("Bad Gateway")).as_deref(), Some("Bad Gateway"));
}

#[test]
fn extract_none_for_unrecognized_shape() {
    assert_eq!(extract_message(&json!({"status": 500})), None);
    assert_eq!(extract_message(&json!([1, 2])), None);
}

// =============================================================================
// unwrap_success
// =============================================================================

#[test]
fn unwrap_nested_envelope() {
    let (data, message) = unwrap_success(Some(json!({"success": true, "message": "ok", "data": [1, 2]})));
    assert_eq!(data, Some(json!([1, 2])));
    assert_eq!(message.as_deref(), Some("ok"));
}

#[test]
fn unwrap_plain_body_becomes_data() {
    let (data, message) = unwrap_success(Some(json!({"id": "l1", "success_rate": 3})));
    assert_eq!(data, Some(json!({"id": "l1", "success_rate": 3})));
    assert!(message.is_none());
}

#[test]
fn unwrap_string_success_flag_is_not_an_envelope() {
    let body = json!({"success": "yes", "data": 1});
    let (data, _) = unwrap_success(Some(body.clone()));
    assert_eq!(data, Some(body));
}

#[test]
fn unwrap_null_data_is_none() {
    let (data, _) = unwrap_success(Some(json!({"success": true, "data": null})));
    assert!(data.is_none());
}

#[test]
fn reply_response_uses_status() {
    let reply = Reply::failure(StatusCode::BAD_REQUEST, "x", "y");
    let resp = reply.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
