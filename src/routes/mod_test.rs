use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Request};
use axum::response::Json;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::*;
use crate::config::ConfigError;
use crate::state::test_helpers;

// =============================================================================
// HELPERS
// =============================================================================

/// Base URL that refuses connections.
const DEAD_UPSTREAM: &str = "http://127.0.0.1:1";

async fn call(app: Router, method: &str, uri: &str, cliente: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cliente) = cliente {
        builder = builder.header("cliente_id", cliente);
    }
    let req = builder.body(Body::from(body.to_owned())).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

/// Every tenant-scoped route with a representative method and body.
const SCOPED_ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "/api/leads", ""),
    ("POST", "/api/leads", r#"{"nome":"Ana"}"#),
    ("POST", "/api/leads/bulk", r#"[{"nome":"Ana"}]"#),
    ("GET", "/api/leads/search?q=ana", ""),
    ("GET", "/api/leads/l1", ""),
    ("PUT", "/api/leads/l1", r#"{"nome":"Ana"}"#),
    ("PATCH", "/api/leads/l1", r#"{"status":"novo"}"#),
    ("DELETE", "/api/leads/l1", ""),
    ("GET", "/api/chat", ""),
    ("POST", "/api/chat", r#"{"mensagem":"oi"}"#),
    ("GET", "/api/chat/cliente", ""),
    ("GET", "/api/chat/session/s1", ""),
    ("DELETE", "/api/chat/session/s1", ""),
    ("GET", "/api/configuracoes", ""),
    ("POST", "/api/configuracoes", r#"{"chave":"a","valor":"b"}"#),
    ("PUT", "/api/configuracoes", r#"[{"chave":"a","valor":"b"}]"#),
    ("GET", "/api/configuracoes/chave/a", ""),
    ("PUT", "/api/configuracoes/chave/a", r#"{"valor":"b"}"#),
    ("DELETE", "/api/configuracoes/chave/a", ""),
    ("GET", "/api/controle-envios/limite-diario", ""),
    ("PUT", "/api/controle-envios/limite-diario", r#"{"limite":100}"#),
    ("GET", "/api/evolution-instances", ""),
    ("POST", "/api/evolution-instances", r#"{"instanceName":"vendas"}"#),
    ("GET", "/api/evolution-instances/vendas", ""),
    ("DELETE", "/api/evolution-instances/vendas", ""),
    ("GET", "/api/evolution-instances/vendas/connect", ""),
    ("GET", "/api/evolution-instances/vendas/status", ""),
    ("POST", "/api/evolution-instances/vendas/restart", ""),
    ("POST", "/api/evolution-instances/vendas/logout", ""),
    ("GET", "/api/mensagens", ""),
    ("POST", "/api/mensagens", r#"{"texto":"oi"}"#),
    ("GET", "/api/google-calendar/credentials", ""),
    ("POST", "/api/google-calendar/credentials", r#"{"client_id":"x"}"#),
    ("DELETE", "/api/google-calendar/credentials", ""),
];

// =============================================================================
// CONFIGURATION AND VALIDATION
// =============================================================================

#[tokio::test]
async fn healthz_ok() {
    let (status, _) = call(app(AppState::unconfigured(ConfigError::MissingApiUrl)), "GET", "/healthz", None, "").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unconfigured_api_answers_500_on_every_route() {
    let state = AppState::unconfigured(ConfigError::MissingApiUrl);
    for (method, uri, body) in SCOPED_ROUTES {
        let (status, json) = call(app(state.clone()), method, uri, Some("t1"), body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{method} {uri}");
        assert_eq!(json["success"], json!(false), "{method} {uri}");
        assert_eq!(json["message"], json!("API externa não configurada"));
    }
    let (status, json) = call(app(state), "GET", "/api/profiles", None, "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], json!(false));
}

#[tokio::test]
async fn unconfigured_wins_over_missing_tenant() {
    let state = AppState::unconfigured(ConfigError::MissingApiUrl);
    let (status, _) = call(app(state), "GET", "/api/leads", None, "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn missing_tenant_header_answers_400_on_every_scoped_route() {
    let state = test_helpers::state_for(DEAD_UPSTREAM);
    for (method, uri, body) in SCOPED_ROUTES {
        let (status, json) = call(app(state.clone()), method, uri, None, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
        assert_eq!(json["success"], json!(false));
        assert_eq!(json["message"], json!("cliente_id é obrigatório"));
    }
}

#[tokio::test]
async fn blank_tenant_header_is_missing() {
    let state = test_helpers::state_for(DEAD_UPSTREAM);
    let (status, _) = call(app(state), "GET", "/api/leads", Some("   "), "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_answers_400_before_forwarding() {
    let state = test_helpers::state_for(DEAD_UPSTREAM);
    let (status, json) = call(app(state), "POST", "/api/leads", Some("t1"), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], json!("Corpo da requisição inválido"));
}

#[tokio::test]
async fn empty_bulk_answers_400() {
    let state = test_helpers::state_for(DEAD_UPSTREAM);
    let (status, _) = call(app(state), "POST", "/api/leads/bulk", Some("t1"), "[]").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreachable_upstream_answers_500_envelope() {
    let state = test_helpers::state_for(DEAD_UPSTREAM);
    let (status, json) = call(app(state), "GET", "/api/leads", Some("t1"), "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], json!(false));
    assert_eq!(json["message"], json!("Erro ao listar leads"));
    assert!(json["error"].is_string());
}

// =============================================================================
// END TO END AGAINST A MOCK EXTERNAL API
// =============================================================================

#[derive(Clone, Default)]
struct Seen {
    calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl Seen {
    fn record(&self, what: impl Into<String>, headers: &HeaderMap) {
        let cliente = headers
            .get("cliente_id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        self.calls.lock().unwrap().push((what.into(), cliente));
    }
}

async fn mock_create_lead(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    seen.record("POST /leads", &headers);
    let nome = body.get("nome").and_then(Value::as_str).unwrap_or_default();
    if nome.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"success": false, "message": "nome é obrigatório"})));
    }
    let cliente = headers
        .get("cliente_id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    (StatusCode::OK, Json(json!({"id": "lead-1", "nome": nome, "cliente_id": cliente})))
}

async fn mock_search(State(seen): State<Seen>, headers: HeaderMap, RawQuery(query): RawQuery) -> Json<Value> {
    seen.record("GET /leads/search", &headers);
    Json(json!({"success": true, "data": [], "message": query}))
}

async fn mock_config_key(State(seen): State<Seen>, headers: HeaderMap, Path(chave): Path<String>) -> Json<Value> {
    seen.record(format!("GET /configuracoes/chave/{chave}"), &headers);
    Json(json!({"chave": chave, "valor": "1"}))
}

async fn mock_profiles(State(seen): State<Seen>, headers: HeaderMap) -> Json<Value> {
    seen.record("GET /profiles", &headers);
    Json(json!([{"id": "p1", "role": "admin"}]))
}

async fn mock_delete_lead(State(seen): State<Seen>, headers: HeaderMap) -> StatusCode {
    seen.record("DELETE /leads/{id}", &headers);
    StatusCode::NO_CONTENT
}

async fn mock_delete_instances(State(seen): State<Seen>, headers: HeaderMap) -> Json<Value> {
    seen.record("DELETE /evolution-instances", &headers);
    Json(json!({"deleted": "all"}))
}

async fn spawn_mock_upstream() -> (String, Seen) {
    let seen = Seen::default();
    let router = Router::new()
        .route("/v1/leads", post(mock_create_lead))
        .route("/v1/leads/search", get(mock_search))
        .route("/v1/leads/{id}", axum::routing::delete(mock_delete_lead))
        .route("/v1/configuracoes/chave/{chave}", get(mock_config_key))
        .route("/v1/profiles", get(mock_profiles))
        .route("/v1/evolution-instances", axum::routing::delete(mock_delete_instances))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}/v1"), seen)
}

#[tokio::test]
async fn create_lead_returns_upstream_data_with_201() {
    let (base, seen) = spawn_mock_upstream().await;
    let state = test_helpers::state_for(&base);

    let (status, json) = call(app(state), "POST", "/api/leads", Some("t1"), r#"{"nome":"Ana"}"#).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], json!(true));
    assert_eq!(json["data"], json!({"id": "lead-1", "nome": "Ana", "cliente_id": "t1"}));
    let calls = seen.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[("POST /leads".to_owned(), Some("t1".to_owned()))]);
}

#[tokio::test]
async fn create_lead_upstream_error_is_mirrored() {
    let (base, _seen) = spawn_mock_upstream().await;
    let state = test_helpers::state_for(&base);

    let (status, json) = call(app(state), "POST", "/api/leads", Some("t1"), r#"{"nome":""}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], json!(false));
    assert_eq!(json["message"], json!("nome é obrigatório"));
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn search_passes_query_and_unwraps_envelope() {
    let (base, _seen) = spawn_mock_upstream().await;
    let state = test_helpers::state_for(&base);

    let (status, json) = call(app(state), "GET", "/api/leads/search?q=ana&status=novo", Some("t1"), "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!([]));
    assert_eq!(json["message"], json!("q=ana&status=novo"));
}

#[tokio::test]
async fn path_params_are_reencoded() {
    let (base, seen) = spawn_mock_upstream().await;
    let state = test_helpers::state_for(&base);

    let (status, json) = call(app(state), "GET", "/api/configuracoes/chave/a%2Fb", Some("t1"), "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["chave"], json!("a/b"));
    assert_eq!(seen.calls.lock().unwrap()[0].0, "GET /configuracoes/chave/a/b");
}

#[tokio::test]
async fn delete_no_content_answers_ok_envelope() {
    let (base, _seen) = spawn_mock_upstream().await;
    let state = test_helpers::state_for(&base);

    let (status, json) = call(app(state), "DELETE", "/api/leads/l1", Some("t1"), "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], json!(true));
}

#[tokio::test]
async fn profiles_forward_without_tenant() {
    let (base, seen) = spawn_mock_upstream().await;
    let state = test_helpers::state_for(&base);

    let (status, json) = call(app(state), "GET", "/api/profiles", None, "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["id"], json!("p1"));
    assert_eq!(seen.calls.lock().unwrap()[0].1, None);
}

#[tokio::test]
async fn unknown_upstream_route_is_404_envelope() {
    let (base, _seen) = spawn_mock_upstream().await;
    let state = test_helpers::state_for(&base);

    let (status, json) = call(app(state), "GET", "/api/mensagens", Some("t1"), "").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], json!(false));
    assert_eq!(json["message"], json!("Erro ao listar mensagens"));
}

#[tokio::test]
async fn dot_path_params_never_reach_parent_resource() {
    let (base, seen) = spawn_mock_upstream().await;
    let state = test_helpers::state_for(&base);

    for uri in ["/api/evolution-instances/%2E%2E", "/api/evolution-instances/%2e", "/api/leads/%2E%2E"] {
        let (status, json) = call(app(state.clone()), "DELETE", uri, Some("t1"), "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["success"], json!(false));
        assert_eq!(json["message"], json!("Parâmetro de rota inválido"));
    }
    assert!(seen.calls.lock().unwrap().is_empty());
}
