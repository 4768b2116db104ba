//! Carpark types: the facility records served by the API and loaded by
//! ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

pub const INVALID_MIN_HEIGHT: &str = "Invalid minHeight value";

// ─── Reference tables ────────────────────────────────────────────────────────

/// A row of one of the two lookup tables (car park type, parking system
/// type). Names are unique within their table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
  pub id:   i64,
  pub name: String,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A normalized carpark row with both reference ids already resolved; the
/// unit the ingestion batch accumulates.
#[derive(Debug, Clone, PartialEq)]
pub struct CarparkRecord {
  pub car_park_no:            String,
  pub address:                String,
  pub x_coord:                f64,
  pub y_coord:                f64,
  pub short_term_parking:     String,
  pub free_parking:           String,
  pub night_parking:          bool,
  pub car_park_decks:         i64,
  pub gantry_height:          f64,
  pub car_park_basement:      bool,
  pub car_park_type_id:       i64,
  pub parking_system_type_id: i64,
}

/// A persisted carpark with its reference rows joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carpark {
  pub id:                  Uuid,
  pub car_park_no:         String,
  pub address:             String,
  pub x_coord:             f64,
  pub y_coord:             f64,
  pub short_term_parking:  String,
  pub free_parking:        String,
  pub night_parking:       bool,
  pub car_park_decks:      i64,
  pub gantry_height:       f64,
  pub car_park_basement:   bool,
  pub car_park_type:       TypeRef,
  pub parking_system_type: TypeRef,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Filters and pagination for [`CarparkStore::list_carparks`].
///
/// [`CarparkStore::list_carparks`]: crate::store::CarparkStore::list_carparks
#[derive(Debug, Clone, PartialEq)]
pub struct CarparkQuery {
  /// `Some(true)`: free parking is offered (anything but `"NO"`).
  /// `Some(false)`: free parking is `"NO"`.
  pub free_parking:  Option<bool>,
  pub night_parking: Option<bool>,
  /// Minimum gantry height in metres, inclusive.
  pub min_height:    Option<f64>,
  /// 1-based.
  pub page:          u32,
  pub limit:         u32,
}

impl Default for CarparkQuery {
  fn default() -> Self {
    Self {
      free_parking:  None,
      night_parking: None,
      min_height:    None,
      page:          1,
      limit:         DEFAULT_PAGE_SIZE,
    }
  }
}

impl CarparkQuery {
  pub fn validate(&self) -> Result<()> {
    if self.page == 0 {
      return Err(Error::InvalidQuery("page must be at least 1".into()));
    }
    if self.limit == 0 || self.limit > MAX_PAGE_SIZE {
      return Err(Error::InvalidQuery(format!(
        "limit must be between 1 and {MAX_PAGE_SIZE}"
      )));
    }
    if let Some(h) = self.min_height
      && !h.is_finite()
    {
      return Err(Error::InvalidQuery(INVALID_MIN_HEIGHT.into()));
    }
    Ok(())
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
  }
}

/// One page of [`Carpark`]s plus the totals needed to page through the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarparkPage {
  pub total_items:  u64,
  pub total_pages:  u64,
  pub current_page: u32,
  pub carparks:     Vec<Carpark>,
}

impl CarparkPage {
  pub fn new(query: &CarparkQuery, total_items: u64, carparks: Vec<Carpark>) -> Self {
    let limit = u64::from(query.limit.max(1));
    Self {
      total_items,
      total_pages: total_items.div_ceil(limit),
      current_page: query.page,
      carparks,
    }
  }
}
