//! Evolution API (WhatsApp) instance routes.
//!
//! Instance names come from the console user; they are forwarded as single
//! percent-encoded path segments so a name can never address another resource.

use axum::body::Bytes;
use axum::extract::Path;
use axum::http::Method;

use super::proxy::{self, Forward, Scoped};
use crate::envelope::Reply;

const ROOT: &str = "evolution-instances";

/// `GET /api/evolution-instances`
pub async fn list(Scoped(target): Scoped) -> Reply {
    proxy::forward(target, Forward::new("listar instâncias", Method::GET, &[ROOT])).await
}

/// `POST /api/evolution-instances`
pub async fn create(Scoped(target): Scoped, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    let fwd = Forward::new("criar instância", Method::POST, &[ROOT])
        .body(Some(body))
        .created();
    Ok(proxy::forward(target, fwd).await)
}

/// `GET /api/evolution-instances/{instance}`
pub async fn get_one(Scoped(target): Scoped, Path(instance): Path<String>) -> Reply {
    proxy::forward(target, Forward::new("buscar instância", Method::GET, &[ROOT, instance.as_str()])).await
}

/// `DELETE /api/evolution-instances/{instance}`
pub async fn delete(Scoped(target): Scoped, Path(instance): Path<String>) -> Reply {
    proxy::forward(target, Forward::new("remover instância", Method::DELETE, &[ROOT, instance.as_str()])).await
}

/// `GET /api/evolution-instances/{instance}/connect`: QR code for pairing.
pub async fn connect(Scoped(target): Scoped, Path(instance): Path<String>) -> Reply {
    let fwd = Forward::new("conectar instância", Method::GET, &[ROOT, instance.as_str(), "connect"]);
    proxy::forward(target, fwd).await
}

/// `GET /api/evolution-instances/{instance}/status`
pub async fn status(Scoped(target): Scoped, Path(instance): Path<String>) -> Reply {
    let fwd = Forward::new("consultar status da instância", Method::GET, &[ROOT, instance.as_str(), "status"]);
    proxy::forward(target, fwd).await
}

/// `POST /api/evolution-instances/{instance}/restart`
pub async fn restart(Scoped(target): Scoped, Path(instance): Path<String>, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::optional_json(&body)?;
    let fwd = Forward::new("reiniciar instância", Method::POST, &[ROOT, instance.as_str(), "restart"]).body(body);
    Ok(proxy::forward(target, fwd).await)
}

/// `POST /api/evolution-instances/{instance}/logout`: unpair the phone.
pub async fn logout(Scoped(target): Scoped, Path(instance): Path<String>, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::optional_json(&body)?;
    let fwd = Forward::new("desconectar instância", Method::POST, &[ROOT, instance.as_str(), "logout"]).body(body);
    Ok(proxy::forward(target, fwd).await)
}
