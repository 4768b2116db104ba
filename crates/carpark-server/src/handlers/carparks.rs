//! Handlers for `/carparks` reads.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/carparks` | Optional `freeParking`, `nightParking`, `minHeight`, `page`, `limit` |
//! | `GET`  | `/carparks/{id}` | 404 if not found |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{PathRejection, QueryRejection},
  },
};
use carpark_core::{
  carpark::{Carpark, CarparkPage, CarparkQuery, DEFAULT_PAGE_SIZE, INVALID_MIN_HEIGHT},
  store::CarparkStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::Error};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  /// `true`: anything but `"NO"`; `false`: exactly `"NO"`.
  pub free_parking:  Option<bool>,
  pub night_parking: Option<bool>,
  /// Minimum gantry height in metres.
  pub min_height:    Option<f64>,
  /// 1-based; defaults to 1.
  pub page:          Option<u32>,
  pub limit:         Option<u32>,
}

impl From<ListParams> for CarparkQuery {
  fn from(p: ListParams) -> Self {
    CarparkQuery {
      free_parking:  p.free_parking,
      night_parking: p.night_parking,
      min_height:    p.min_height,
      page:          p.page.unwrap_or(1),
      limit:         p.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    }
  }
}

/// A `minHeight` that is not a number reads the same as a non-finite one.
fn query_error(rejection: QueryRejection) -> Error {
  let text = rejection.body_text();
  if text.contains("minHeight") {
    Error::BadRequest(INVALID_MIN_HEIGHT.into())
  } else {
    Error::BadRequest(text)
  }
}

/// `GET /carparks[?freeParking=..][&nightParking=..][&minHeight=..][&page=..][&limit=..]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _user: AuthUser,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<CarparkPage>, Error>
where
  S: CarparkStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let Query(params) = params.map_err(query_error)?;
  let query = CarparkQuery::from(params);
  query.validate().map_err(Error::store)?;

  let page = state
    .store
    .list_carparks(&query)
    .await
    .map_err(Error::store)?;
  Ok(Json(page))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /carparks/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _user: AuthUser,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Carpark>, Error>
where
  S: CarparkStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let Path(id) = id.map_err(|_| Error::BadRequest("Invalid carpark ID format".into()))?;
  let carpark = state
    .store
    .get_carpark(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound("Carpark not found".into()))?;
  Ok(Json(carpark))
}
