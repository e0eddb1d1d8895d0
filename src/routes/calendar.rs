//! Google Calendar credential routes.

use axum::body::Bytes;
use axum::http::Method;

use super::proxy::{self, Forward, Scoped};
use crate::envelope::Reply;

const PATH: [&str; 2] = ["google-calendar", "credentials"];

/// `GET /api/google-calendar/credentials`
pub async fn get_credentials(Scoped(target): Scoped) -> Reply {
    proxy::forward(target, Forward::new("buscar credenciais do Google Calendar", Method::GET, &PATH)).await
}

/// `POST /api/google-calendar/credentials`
pub async fn save_credentials(Scoped(target): Scoped, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    let fwd = Forward::new("salvar credenciais do Google Calendar", Method::POST, &PATH)
        .body(Some(body))
        .created();
    Ok(proxy::forward(target, fwd).await)
}

/// `DELETE /api/google-calendar/credentials`
pub async fn delete_credentials(Scoped(target): Scoped) -> Reply {
    proxy::forward(target, Forward::new("remover credenciais do Google Calendar", Method::DELETE, &PATH)).await
}
