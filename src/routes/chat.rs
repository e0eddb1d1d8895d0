//! Chat conversation routes.

use axum::body::Bytes;
use axum::extract::{Path, RawQuery};
use axum::http::Method;

use super::proxy::{self, Forward, Scoped};
use crate::envelope::Reply;

/// `GET /api/chat`: list conversations.
pub async fn list(Scoped(target): Scoped, RawQuery(query): RawQuery) -> Reply {
    proxy::forward(target, Forward::new("listar conversas", Method::GET, &["chat"]).query(query)).await
}

/// `POST /api/chat`: append a chat message.
pub async fn create(Scoped(target): Scoped, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    Ok(proxy::forward(target, Forward::new("enviar mensagem de chat", Method::POST, &["chat"]).body(Some(body))).await)
}

/// `GET /api/chat/cliente`: conversations of the tenant.
pub async fn by_cliente(Scoped(target): Scoped, RawQuery(query): RawQuery) -> Reply {
    proxy::forward(target, Forward::new("listar conversas do cliente", Method::GET, &["chat", "cliente"]).query(query))
        .await
}

/// `GET /api/chat/session/{session_id}`: message history of one session.
pub async fn session_history(Scoped(target): Scoped, Path(session_id): Path<String>) -> Reply {
    let fwd = Forward::new("carregar sessão de chat", Method::GET, &["chat", "session", session_id.as_str()]);
    proxy::forward(target, fwd).await
}

/// `DELETE /api/chat/session/{session_id}`
pub async fn delete_session(Scoped(target): Scoped, Path(session_id): Path<String>) -> Reply {
    let fwd = Forward::new("remover sessão de chat", Method::DELETE, &["chat", "session", session_id.as_str()]);
    proxy::forward(target, fwd).await
}
