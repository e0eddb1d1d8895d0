use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::post;
use serde_json::json;

use super::*;
use crate::routes;
use crate::state::test_helpers::state_for;

// =============================================================================
// CONSTRUCTION
// =============================================================================

#[test]
fn absolute_base_is_used_as_is() {
    let api = CrmApi::new("https://crm.example.com/api", None).unwrap();
    assert_eq!(api.base_url().as_str(), "https://crm.example.com/api");
}

#[test]
fn relative_base_joins_origin() {
    let api = CrmApi::new("/api", Some("http://localhost:5173")).unwrap();
    assert_eq!(api.base_url().as_str(), "http://localhost:5173/api");
}

#[test]
fn relative_base_without_origin_is_rejected() {
    assert!(matches!(CrmApi::new("/api", None), Err(ConfigError::InvalidApiUrl { .. })));
}

#[test]
fn non_http_base_is_rejected() {
    assert!(CrmApi::new("ftp://crm.example.com", None).is_err());
}

#[test]
fn path_segments_are_encoded() {
    let api = CrmApi::new("https://crm.example.com/api/", None).unwrap();
    let url = api.url_for(&["leads", "a/b"], &[("q", "ana maria")]).unwrap();
    assert_eq!(url.as_str(), "https://crm.example.com/api/leads/a%2Fb?q=ana+maria");
}

#[test]
fn dot_segments_are_refused_before_sending() {
    let api = CrmApi::new("https://crm.example.com/api", None).unwrap();
    assert_eq!(api.url_for(&["leads", ".."], &[]).unwrap_err().status, 400);
}

// =============================================================================
// RESPONSE INTERPRETATION
// =============================================================================

#[test]
fn success_envelope_yields_data() {
    let out = interpret(200, r#"{"success":true,"data":[{"id":"1"}]}"#).unwrap();
    assert_eq!(out, json!([{"id": "1"}]));
}

#[test]
fn success_without_data_yields_null() {
    assert_eq!(interpret(200, r#"{"success":true,"message":"ok"}"#).unwrap(), Value::Null);
    assert_eq!(interpret(204, "").unwrap(), Value::Null);
}

#[test]
fn envelope_reporting_failure_under_2xx_is_an_error() {
    let err = interpret(200, r#"{"success":false,"message":"limite atingido"}"#).unwrap_err();
    assert_eq!(err, ApiFailure { status: 200, message: "limite atingido".into() });
}

#[test]
fn error_status_uses_extracted_message() {
    let err = interpret(400, r#"{"success":false,"message":"nome é obrigatório","error":"Bad Request"}"#).unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(err.message, "nome é obrigatório");
}

#[test]
fn error_status_without_message_names_status() {
    assert_eq!(interpret(502, "").unwrap_err().message, "HTTP 502");
}

// =============================================================================
// END TO END: CrmApi -> proxy routes -> mock external API
// =============================================================================

async fn upstream_leads(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let cliente_id = headers
        .get(CLIENTE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    if body.get("nome").is_none() {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": [{"msg": "nome ausente"}]})));
    }
    (StatusCode::CREATED, Json(json!({"success": true, "data": {"id": "lead-1", "cliente_id": cliente_id}})))
}

async fn upstream_list() -> (StatusCode, Json<Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"erro": "banco indisponível"})))
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn console_api() -> CrmApi {
    let upstream = serve(Router::new().route("/v1/leads", post(upstream_leads).get(upstream_list))).await;
    let proxy = serve(routes::app(state_for(&format!("{upstream}/v1")))).await;
    CrmApi::new("/api", Some(&proxy)).unwrap()
}

#[tokio::test]
async fn create_lead_through_proxy() {
    let api = console_api().await.with_cliente_id(Some("t1".into()));
    let lead = api.create_lead(&json!({"nome": "Ana"})).await.unwrap();
    assert_eq!(lead, json!({"id": "lead-1", "cliente_id": "t1"}));
}

#[tokio::test]
async fn upstream_validation_error_reaches_caller() {
    let api = console_api().await.with_cliente_id(Some("t1".into()));
    let err = api.create_lead(&json!({"email": "a@x.com"})).await.unwrap_err();
    assert_eq!(err, ApiFailure { status: 422, message: "nome ausente".into() });
}

#[tokio::test]
async fn upstream_server_error_is_mirrored() {
    let api = console_api().await.with_cliente_id(Some("t1".into()));
    let err = api.list_leads().await.unwrap_err();
    assert_eq!(err.status, 500);
    assert_eq!(err.message, "banco indisponível");
}

#[tokio::test]
async fn missing_tenant_is_rejected_by_proxy() {
    let api = console_api().await;
    let err = api.list_leads().await.unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(err.message, "cliente_id é obrigatório");
}

#[tokio::test]
async fn unreachable_proxy_is_status_zero() {
    let api = CrmApi::new("http://127.0.0.1:1/api", None).unwrap().with_cliente_id(Some("t1".into()));
    assert_eq!(api.list_leads().await.unwrap_err().status, 0);
}

#[tokio::test]
async fn unrouted_path_reports_not_found() {
    let api = console_api().await.with_cliente_id(Some("t1".into()));
    let err = api.get(&["nao-existe"], &[]).await.unwrap_err();
    assert_eq!(err.status, 404);
}
