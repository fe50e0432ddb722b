//! Request fixtures.

use cds_routing::{Request, UserInfo};
use serde_json::Value;
use std::sync::Arc;

/// Request for `event` on `entity` with a JSON payload
pub fn entity_request(event: &str, entity: &str, data: Value) -> Arc<Request> {
    Request::builder(event).entity(entity).data(data).build()
}

/// Request carrying `Authorization: Bearer {token}`
pub fn bearer_request(event: &str, token: &str) -> Arc<Request> {
    Request::builder(event)
        .header("Authorization", format!("Bearer {token}"))
        .build()
}

/// Request with an authenticated user
pub fn user_request(event: &str, user_id: &str, locale: Option<&str>) -> Arc<Request> {
    Request::builder(event).user(test_user(user_id, locale)).build()
}

/// Authenticated user without attributes
pub fn test_user(id: &str, locale: Option<&str>) -> UserInfo {
    UserInfo {
        id: id.to_string(),
        locale: locale.map(str::to_string),
        ..UserInfo::default()
    }
}
