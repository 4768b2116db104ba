//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that they sort lexically. UUIDs are stored as hyphenated lowercase
//! strings. Booleans use SQLite's native 0/1 integers.

use carpark_core::{
  carpark::{Carpark, TypeRef},
  user::{Favorite, User},
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every carpark read; [`RawCarpark::from_row`] relies
/// on this order. Further `JOIN`/`WHERE` clauses may be appended.
pub const SELECT_CARPARK: &str = "
  SELECT
    c.carpark_id, c.car_park_no, c.address, c.x_coord, c.y_coord,
    c.short_term_parking, c.free_parking, c.night_parking,
    c.car_park_decks, c.gantry_height, c.car_park_basement,
    t.id, t.name, p.id, p.name,
    c.created_at, c.updated_at
  FROM carparks c
  JOIN car_park_types       t ON t.id = c.car_park_type_id
  JOIN parking_system_types p ON p.id = c.parking_system_type_id";

/// A `carparks` row joined with both reference tables.
pub struct RawCarpark {
  pub carpark_id:               String,
  pub car_park_no:              String,
  pub address:                  String,
  pub x_coord:                  f64,
  pub y_coord:                  f64,
  pub short_term_parking:       String,
  pub free_parking:             String,
  pub night_parking:            bool,
  pub car_park_decks:           i64,
  pub gantry_height:            f64,
  pub car_park_basement:        bool,
  pub car_park_type_id:         i64,
  pub car_park_type_name:       String,
  pub parking_system_type_id:   i64,
  pub parking_system_type_name: String,
  pub created_at:               String,
  pub updated_at:               String,
}

impl RawCarpark {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      carpark_id:               row.get(0)?,
      car_park_no:              row.get(1)?,
      address:                  row.get(2)?,
      x_coord:                  row.get(3)?,
      y_coord:                  row.get(4)?,
      short_term_parking:       row.get(5)?,
      free_parking:             row.get(6)?,
      night_parking:            row.get(7)?,
      car_park_decks:           row.get(8)?,
      gantry_height:            row.get(9)?,
      car_park_basement:        row.get(10)?,
      car_park_type_id:         row.get(11)?,
      car_park_type_name:       row.get(12)?,
      parking_system_type_id:   row.get(13)?,
      parking_system_type_name: row.get(14)?,
      created_at:               row.get(15)?,
      updated_at:               row.get(16)?,
    })
  }

  pub fn into_carpark(self) -> Result<Carpark> {
    Ok(Carpark {
      id:                  decode_uuid(&self.carpark_id)?,
      car_park_no:         self.car_park_no,
      address:             self.address,
      x_coord:             self.x_coord,
      y_coord:             self.y_coord,
      short_term_parking:  self.short_term_parking,
      free_parking:        self.free_parking,
      night_parking:       self.night_parking,
      car_park_decks:      self.car_park_decks,
      gantry_height:       self.gantry_height,
      car_park_basement:   self.car_park_basement,
      car_park_type:       TypeRef {
        id:   self.car_park_type_id,
        name: self.car_park_type_name,
      },
      parking_system_type: TypeRef {
        id:   self.parking_system_type_id,
        name: self.parking_system_type_name,
      },
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub username:   String,
  pub created_at: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      username:   row.get(1)?,
      created_at: row.get(2)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         decode_uuid(&self.user_id)?,
      username:   self.username,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `favorites` row.
pub struct RawFavorite {
  pub user_id:    String,
  pub carpark_id: String,
  pub created_at: String,
}

impl RawFavorite {
  pub fn into_favorite(self) -> Result<Favorite> {
    Ok(Favorite {
      user_id:    decode_uuid(&self.user_id)?,
      carpark_id: decode_uuid(&self.carpark_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
