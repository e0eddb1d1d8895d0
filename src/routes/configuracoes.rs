//! Tenant configuration routes (key/value settings).

use axum::body::Bytes;
use axum::extract::Path;
use axum::http::Method;

use super::proxy::{self, Forward, Scoped};
use crate::envelope::Reply;

/// `GET /api/configuracoes`
pub async fn list(Scoped(target): Scoped) -> Reply {
    proxy::forward(target, Forward::new("listar configurações", Method::GET, &["configuracoes"])).await
}

/// `POST /api/configuracoes`
pub async fn create(Scoped(target): Scoped, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    let fwd = Forward::new("criar configuração", Method::POST, &["configuracoes"])
        .body(Some(body))
        .created();
    Ok(proxy::forward(target, fwd).await)
}

/// `PUT /api/configuracoes`: save several settings at once.
pub async fn update(Scoped(target): Scoped, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    Ok(proxy::forward(target, Forward::new("salvar configurações", Method::PUT, &["configuracoes"]).body(Some(body))).await)
}

/// `GET /api/configuracoes/chave/{chave}`
pub async fn get_key(Scoped(target): Scoped, Path(chave): Path<String>) -> Reply {
    let fwd = Forward::new("buscar configuração", Method::GET, &["configuracoes", "chave", chave.as_str()]);
    proxy::forward(target, fwd).await
}

/// `PUT /api/configuracoes/chave/{chave}`
pub async fn put_key(Scoped(target): Scoped, Path(chave): Path<String>, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    let fwd = Forward::new("salvar configuração", Method::PUT, &["configuracoes", "chave", chave.as_str()]).body(Some(body));
    Ok(proxy::forward(target, fwd).await)
}

/// `DELETE /api/configuracoes/chave/{chave}`
pub async fn delete_key(Scoped(target): Scoped, Path(chave): Path<String>) -> Reply {
    let fwd = Forward::new("remover configuração", Method::DELETE, &["configuracoes", "chave", chave.as_str()]);
    proxy::forward(target, fwd).await
}
