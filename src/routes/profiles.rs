//! Profile routes. Not tenant-scoped: super admins list profiles across tenants.

use axum::extract::RawQuery;
use axum::http::Method;

use super::proxy::{self, Forward, Unscoped};
use crate::envelope::Reply;

/// `GET /api/profiles`
pub async fn list(Unscoped(target): Unscoped, RawQuery(query): RawQuery) -> Reply {
    proxy::forward(target, Forward::new("listar perfis", Method::GET, &["profiles"]).query(query)).await
}
