//! Outbound message routes.

use axum::body::Bytes;
use axum::extract::RawQuery;
use axum::http::Method;

use super::proxy::{self, Forward, Scoped};
use crate::envelope::Reply;

/// `GET /api/mensagens`
pub async fn list(Scoped(target): Scoped, RawQuery(query): RawQuery) -> Reply {
    proxy::forward(target, Forward::new("listar mensagens", Method::GET, &["mensagens"]).query(query)).await
}

/// `POST /api/mensagens`
pub async fn create(Scoped(target): Scoped, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    let fwd = Forward::new("enviar mensagem", Method::POST, &["mensagens"])
        .body(Some(body))
        .created();
    Ok(proxy::forward(target, fwd).await)
}
