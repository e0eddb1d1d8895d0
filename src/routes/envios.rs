//! Send-control routes (daily message limit).

use axum::body::Bytes;
use axum::http::Method;

use super::proxy::{self, Forward, Scoped};
use crate::envelope::Reply;

const PATH: [&str; 2] = ["controle-envios", "limite-diario"];

/// `GET /api/controle-envios/limite-diario`
pub async fn get_daily_limit(Scoped(target): Scoped) -> Reply {
    proxy::forward(target, Forward::new("buscar limite diário", Method::GET, &PATH)).await
}

/// `PUT /api/controle-envios/limite-diario`
pub async fn put_daily_limit(Scoped(target): Scoped, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    Ok(proxy::forward(target, Forward::new("salvar limite diário", Method::PUT, &PATH).body(Some(body))).await)
}
