pub mod carparks;
pub mod favorites;
pub mod upload;

use axum::{Json, http::StatusCode, response::IntoResponse};
use carpark_core::user::User;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// The caller as echoed back by favorites endpoints.
#[derive(Debug, Serialize)]
pub struct UserSummary {
  pub id:       Uuid,
  pub username: String,
}

impl From<User> for UserSummary {
  fn from(u: User) -> Self {
    UserSummary { id: u.id, username: u.username }
  }
}

/// `GET /health`: unauthenticated liveness probe.
pub async fn health() -> impl IntoResponse {
  (StatusCode::OK, Json(json!({ "status": "ok" })))
}
