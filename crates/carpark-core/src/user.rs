//! Users and their favorite carparks.
//!
//! Users are provisioned from configuration; the store only ever sees the
//! hash of a bearer token, never the token itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:         Uuid,
  pub username:   String,
  pub created_at: DateTime<Utc>,
}

/// A (user, carpark) pair. At most one exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
  pub user_id:    Uuid,
  pub carpark_id: Uuid,
  pub created_at: DateTime<Utc>,
}
