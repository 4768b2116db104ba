//! Types shared by every implementation of the CSV batch loader.
//!
//! A backend reads [`CsvRow`]s from the source, resolves the two reference
//! names to ids, normalizes the row with [`CsvRow::into_record`] and upserts
//! the resulting [`CarparkRecord`]s in batches of [`BATCH_SIZE`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::carpark::CarparkRecord;

/// Number of records accumulated before a batch is flushed to the store.
pub const BATCH_SIZE: usize = 100;

/// Header names every source file must carry, in their usual order.
pub const REQUIRED_COLUMNS: [&str; 12] = [
  "car_park_no",
  "address",
  "x_coord",
  "y_coord",
  "short_term_parking",
  "free_parking",
  "night_parking",
  "car_park_decks",
  "gantry_height",
  "car_park_basement",
  "car_park_type",
  "type_of_parking_system",
];

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Why an ingestion run was aborted. Whatever the kind, nothing from the run
/// was persisted.
#[derive(Debug, Error)]
pub enum IngestError {
  /// The source could not be opened or read.
  #[error("failed to read source: {0}")]
  Stream(#[source] std::io::Error),

  /// A row is malformed or lacks a required column.
  #[error("malformed record at line {line}: {message}")]
  Parse { line: u64, message: String },

  /// A numeric column holds something that is not a finite number.
  #[error("invalid {column} at line {line}: {value:?}")]
  Validation {
    line:   u64,
    column: &'static str,
    value:  String,
  },

  /// A uniqueness or foreign-key constraint rejected a write.
  #[error("constraint violation: {0}")]
  Constraint(String),

  #[error("transaction failed: {0}")]
  Transaction(String),
}

impl IngestError {
  /// `true` when the source itself is at fault rather than the store.
  pub fn is_input_error(&self) -> bool {
    matches!(
      self,
      Self::Stream(_) | Self::Parse { .. } | Self::Validation { .. }
    )
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Summary of a committed ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
  /// Records read from the source (and upserted).
  pub records:                      usize,
  /// Size of each flush, in the order they happened.
  pub batches:                      Vec<usize>,
  pub car_park_types_created:       usize,
  pub parking_system_types_created: usize,
}

// ─── Source rows ─────────────────────────────────────────────────────────────

/// One data row of the source file, keyed by header name. Columns not listed
/// here are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvRow {
  pub car_park_no:            String,
  pub address:                String,
  pub x_coord:                String,
  pub y_coord:                String,
  pub short_term_parking:     String,
  pub free_parking:           String,
  pub night_parking:          String,
  pub car_park_decks:         String,
  pub gantry_height:          String,
  pub car_park_basement:      String,
  pub car_park_type:          String,
  pub type_of_parking_system: String,
}

impl CsvRow {
  /// Normalize into a [`CarparkRecord`] carrying the resolved reference ids.
  ///
  /// `line` is the 1-based source line, used only for error reporting.
  pub fn into_record(
    self,
    line: u64,
    car_park_type_id: i64,
    parking_system_type_id: i64,
  ) -> Result<CarparkRecord, IngestError> {
    let car_park_no = self.car_park_no.trim().to_owned();
    if car_park_no.is_empty() {
      return Err(IngestError::Parse {
        line,
        message: "car_park_no is empty".into(),
      });
    }

    Ok(CarparkRecord {
      car_park_no,
      x_coord: parse_float(line, "x_coord", &self.x_coord)?,
      y_coord: parse_float(line, "y_coord", &self.y_coord)?,
      car_park_decks: parse_int(line, "car_park_decks", &self.car_park_decks)?,
      gantry_height: parse_float(line, "gantry_height", &self.gantry_height)?,
      night_parking: is_yes(&self.night_parking),
      car_park_basement: is_yes(&self.car_park_basement),
      address: self.address,
      short_term_parking: self.short_term_parking,
      free_parking: self.free_parking,
      car_park_type_id,
      parking_system_type_id,
    })
  }
}

/// Flag columns are `YES` in any case; anything else is `false`.
pub fn is_yes(raw: &str) -> bool { raw.trim().eq_ignore_ascii_case("YES") }

fn parse_float(line: u64, column: &'static str, raw: &str) -> Result<f64, IngestError> {
  raw
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|v| v.is_finite())
    .ok_or_else(|| IngestError::Validation { line, column, value: raw.to_owned() })
}

fn parse_int(line: u64, column: &'static str, raw: &str) -> Result<i64, IngestError> {
  raw
    .trim()
    .parse::<i64>()
    .map_err(|_| IngestError::Validation { line, column, value: raw.to_owned() })
}
