//! Handlers for the caller's favorite carparks.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/carparks/favorites` | The caller and their favorites |
//! | `POST`   | `/carparks/{id}/favorite` | Idempotent; 404 if the carpark is unknown |
//! | `DELETE` | `/carparks/{id}/favorite` | 204; 404 if not a favorite |

use axum::{
  Json,
  extract::{Path, State, rejection::PathRejection},
  http::StatusCode,
};
use carpark_core::{carpark::Carpark, store::CarparkStore};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::Error, handlers::UserSummary};

fn carpark_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, Error> {
  id.map(|Path(id)| id)
    .map_err(|_| Error::BadRequest("Invalid carpark ID format".into()))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
  pub user:      UserSummary,
  pub favorites: Vec<Carpark>,
}

/// `GET /carparks/favorites`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
) -> Result<Json<FavoritesResponse>, Error>
where
  S: CarparkStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let favorites = state
    .store
    .list_favorites(user.id)
    .await
    .map_err(Error::store)?;
  Ok(Json(FavoritesResponse { user: user.into(), favorites }))
}

// ─── Add ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AddedResponse {
  pub message: &'static str,
  pub user:    UserSummary,
}

/// `POST /carparks/{id}/favorite`
pub async fn add<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AddedResponse>, Error>
where
  S: CarparkStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let carpark_id = carpark_id(id)?;
  state
    .store
    .add_favorite(user.id, carpark_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("Carpark not found".into()))?;

  Ok(Json(AddedResponse {
    message: "Added to favorites",
    user:    user.into(),
  }))
}

// ─── Remove ───────────────────────────────────────────────────────────────────

/// `DELETE /carparks/{id}/favorite`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, Error>
where
  S: CarparkStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let carpark_id = carpark_id(id)?;
  let removed = state
    .store
    .remove_favorite(user.id, carpark_id)
    .await
    .map_err(Error::store)?;

  if removed {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(Error::NotFound("Carpark is not a favorite".into()))
  }
}
