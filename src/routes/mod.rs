//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every `/api/...` route is a thin forwarder to the external REST API. The
//! paths mirror the external API one to one; handlers only validate the
//! tenant header and body, then hand off to `proxy::forward`.

pub mod calendar;
pub mod chat;
pub mod configuracoes;
pub mod envios;
pub mod evolution;
pub mod leads;
pub mod mensagens;
pub mod profiles;
pub mod proxy;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_routes()
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/leads", get(leads::list).post(leads::create))
        .route("/api/leads/bulk", post(leads::bulk))
        .route("/api/leads/search", get(leads::search))
        .route(
            "/api/leads/{id}",
            get(leads::get_one)
                .put(leads::replace)
                .patch(leads::patch)
                .delete(leads::delete),
        )
        .route("/api/chat", get(chat::list).post(chat::create))
        .route("/api/chat/cliente", get(chat::by_cliente))
        .route(
            "/api/chat/session/{session_id}",
            get(chat::session_history).delete(chat::delete_session),
        )
        .route(
            "/api/configuracoes",
            get(configuracoes::list)
                .post(configuracoes::create)
                .put(configuracoes::update),
        )
        .route(
            "/api/configuracoes/chave/{chave}",
            get(configuracoes::get_key)
                .put(configuracoes::put_key)
                .delete(configuracoes::delete_key),
        )
        .route(
            "/api/controle-envios/limite-diario",
            get(envios::get_daily_limit).put(envios::put_daily_limit),
        )
        .route("/api/evolution-instances", get(evolution::list).post(evolution::create))
        .route(
            "/api/evolution-instances/{instance}",
            get(evolution::get_one).delete(evolution::delete),
        )
        .route("/api/evolution-instances/{instance}/connect", get(evolution::connect))
        .route("/api/evolution-instances/{instance}/status", get(evolution::status))
        .route("/api/evolution-instances/{instance}/restart", post(evolution::restart))
        .route("/api/evolution-instances/{instance}/logout", post(evolution::logout))
        .route("/api/mensagens", get(mensagens::list).post(mensagens::create))
        .route(
            "/api/google-calendar/credentials",
            get(calendar::get_credentials)
                .post(calendar::save_credentials)
                .delete(calendar::delete_credentials),
        )
        .route("/api/profiles", get(profiles::list))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
