//! Lead routes: CRUD, bulk import and search.

use axum::body::Bytes;
use axum::extract::{Path, RawQuery};
use axum::http::Method;
use serde_json::Value;

use super::proxy::{self, Forward, Scoped, invalid_body};
use crate::envelope::Reply;

/// `GET /api/leads`: list leads of the tenant.
pub async fn list(Scoped(target): Scoped, RawQuery(query): RawQuery) -> Reply {
    proxy::forward(target, Forward::new("listar leads", Method::GET, &["leads"]).query(query)).await
}

/// `POST /api/leads`: create a lead.
pub async fn create(Scoped(target): Scoped, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    let fwd = Forward::new("criar lead", Method::POST, &["leads"])
        .body(Some(body))
        .created();
    Ok(proxy::forward(target, fwd).await)
}

/// `POST /api/leads/bulk`: create many leads at once.
pub async fn bulk(Scoped(target): Scoped, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    validate_bulk(&body)?;
    let fwd = Forward::new("importar leads", Method::POST, &["leads", "bulk"])
        .body(Some(body))
        .created();
    Ok(proxy::forward(target, fwd).await)
}

/// `GET /api/leads/search`: search leads; the query string is passed through.
pub async fn search(Scoped(target): Scoped, RawQuery(query): RawQuery) -> Reply {
    proxy::forward(target, Forward::new("buscar leads", Method::GET, &["leads", "search"]).query(query)).await
}

/// `GET /api/leads/{id}`
pub async fn get_one(Scoped(target): Scoped, Path(id): Path<String>) -> Reply {
    proxy::forward(target, Forward::new("buscar lead", Method::GET, &["leads", id.as_str()])).await
}

/// `PUT /api/leads/{id}`
pub async fn replace(Scoped(target): Scoped, Path(id): Path<String>, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    Ok(proxy::forward(target, Forward::new("atualizar lead", Method::PUT, &["leads", id.as_str()]).body(Some(body))).await)
}

/// `PATCH /api/leads/{id}`
pub async fn patch(Scoped(target): Scoped, Path(id): Path<String>, body: Bytes) -> Result<Reply, Reply> {
    let body = proxy::required_json(&body)?;
    Ok(proxy::forward(target, Forward::new("atualizar lead", Method::PATCH, &["leads", id.as_str()]).body(Some(body))).await)
}

/// `DELETE /api/leads/{id}`
pub async fn delete(Scoped(target): Scoped, Path(id): Path<String>) -> Reply {
    proxy::forward(target, Forward::new("remover lead", Method::DELETE, &["leads", id.as_str()])).await
}

/// A bulk body is a non-empty array of leads, or an object wrapping one in `leads`.
pub(crate) fn validate_bulk(body: &Value) -> Result<(), Reply> {
    let leads = match body {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("leads") {
            Some(Value::Array(items)) => items,
            _ => return Err(invalid_body("campo leads deve ser uma lista".to_owned())),
        },
        _ => return Err(invalid_body("esperado lista de leads".to_owned())),
    };
    if leads.is_empty() {
        return Err(invalid_body("lista de leads vazia".to_owned()));
    }
    if !leads.iter().all(Value::is_object) {
        return Err(invalid_body("cada lead deve ser um objeto".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "leads_test.rs"]
mod tests;
