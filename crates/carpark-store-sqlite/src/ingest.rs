//! The CSV batch loader.
//!
//! [`run`] executes synchronously on the store's SQLite thread. One
//! `BEGIN IMMEDIATE` transaction spans the whole source; the transaction
//! handle is passed explicitly to reference resolution and to every batch
//! flush. Returning early with an error drops the transaction, which rolls
//! it back.

use std::io::Read;

use carpark_core::{
  carpark::CarparkRecord,
  ingest::{BATCH_SIZE, CsvRow, IngestError, IngestReport, REQUIRED_COLUMNS},
};
use chrono::Utc;
use rusqlite::{Transaction, TransactionBehavior, types::Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{encode_dt, encode_uuid},
};

/// Values bound per row by [`flush`].
const COLUMNS_PER_ROW: usize = 15;

// ─── Row source ──────────────────────────────────────────────────────────────

/// A lazy, single-pass sequence of `(line, row)` pairs read from a CSV source
/// with a header line. Blank lines are skipped by the reader.
struct RowSource<R> {
  reader:  csv::Reader<R>,
  headers: csv::StringRecord,
  record:  csv::StringRecord,
}

impl<R: Read> RowSource<R> {
  fn open(source: R) -> Result<Self, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
      .has_headers(true)
      .trim(csv::Trim::Headers)
      .from_reader(source);
    let headers = reader.headers().map_err(csv_error)?.clone();

    if let Some(missing) = REQUIRED_COLUMNS
      .iter()
      .find(|col| !headers.iter().any(|h| h == **col))
    {
      return Err(IngestError::Parse {
        line:    1,
        message: format!("missing column {missing:?}"),
      });
    }

    Ok(Self { reader, headers, record: csv::StringRecord::new() })
  }
}

impl<R: Read> Iterator for RowSource<R> {
  type Item = Result<(u64, CsvRow), IngestError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self.reader.read_record(&mut self.record) {
      Ok(false) => None,
      Ok(true) => {
        let line = self.record.position().map_or(0, csv::Position::line);
        Some(
          self
            .record
            .deserialize::<CsvRow>(Some(&self.headers))
            .map(|row| (line, row))
            .map_err(|e| IngestError::Parse { line, message: e.to_string() }),
        )
      }
      Err(e) => Some(Err(csv_error(e))),
    }
  }
}

fn csv_error(err: csv::Error) -> IngestError {
  let line = err.position().map_or(0, csv::Position::line);
  let message = err.to_string();
  match err.into_kind() {
    csv::ErrorKind::Io(io) => IngestError::Stream(io),
    _ => IngestError::Parse { line, message },
  }
}

/// Constraint violations become [`IngestError::Constraint`]; anything else is
/// reported as a plain database error.
fn db_error(err: rusqlite::Error) -> Error {
  match err.sqlite_error_code() {
    Some(rusqlite::ErrorCode::ConstraintViolation) => {
      IngestError::Constraint(err.to_string()).into()
    }
    _ => err.into(),
  }
}

// ─── Reference tables ────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum RefTable {
  CarParkType,
  ParkingSystemType,
}

impl RefTable {
  fn insert_sql(self) -> &'static str {
    match self {
      Self::CarParkType => {
        "INSERT INTO car_park_types (name) VALUES (?1) ON CONFLICT(name) DO NOTHING"
      }
      Self::ParkingSystemType => {
        "INSERT INTO parking_system_types (name) VALUES (?1) ON CONFLICT(name) DO NOTHING"
      }
    }
  }

  fn select_sql(self) -> &'static str {
    match self {
      Self::CarParkType => "SELECT id FROM car_park_types WHERE name = ?1",
      Self::ParkingSystemType => "SELECT id FROM parking_system_types WHERE name = ?1",
    }
  }
}

/// Find-or-create a reference row by name. Returns `(id, created)`.
///
/// The conditional insert is a no-op when the name already exists, including
/// when an earlier row of the same run created it.
fn resolve_ref(tx: &Transaction<'_>, table: RefTable, name: &str) -> Result<(i64, bool)> {
  let created = tx
    .prepare_cached(table.insert_sql())
    .and_then(|mut stmt| stmt.execute([name]))
    .map_err(db_error)?
    == 1;
  let id: i64 = tx
    .prepare_cached(table.select_sql())
    .and_then(|mut stmt| stmt.query_row([name], |r| r.get(0)))
    .map_err(db_error)?;
  Ok((id, created))
}

// ─── Batch upsert ────────────────────────────────────────────────────────────

/// Upsert every record of `batch` with one multi-row statement, then clear it.
///
/// Existing rows (matched on `car_park_no`) keep their `carpark_id` and
/// `created_at`; every other column is overwritten.
fn flush(tx: &Transaction<'_>, batch: &mut Vec<CarparkRecord>) -> Result<usize> {
  let rows = batch.len();
  if rows == 0 {
    return Ok(0);
  }

  let row_placeholders = format!("({})", vec!["?"; COLUMNS_PER_ROW].join(", "));
  let sql = format!(
    "INSERT INTO carparks (
       carpark_id, car_park_no, address, x_coord, y_coord,
       short_term_parking, free_parking, night_parking, car_park_decks,
       gantry_height, car_park_basement, car_park_type_id,
       parking_system_type_id, created_at, updated_at
     ) VALUES {}
     ON CONFLICT(car_park_no) DO UPDATE SET
       address                = excluded.address,
       x_coord                = excluded.x_coord,
       y_coord                = excluded.y_coord,
       short_term_parking     = excluded.short_term_parking,
       free_parking           = excluded.free_parking,
       night_parking          = excluded.night_parking,
       car_park_decks         = excluded.car_park_decks,
       gantry_height          = excluded.gantry_height,
       car_park_basement      = excluded.car_park_basement,
       car_park_type_id       = excluded.car_park_type_id,
       parking_system_type_id = excluded.parking_system_type_id,
       updated_at             = excluded.updated_at",
    vec![row_placeholders.as_str(); rows].join(", ")
  );

  let now = encode_dt(Utc::now());
  let mut values: Vec<Value> = Vec::with_capacity(rows * COLUMNS_PER_ROW);
  for rec in batch.drain(..) {
    values.extend([
      Value::Text(encode_uuid(Uuid::new_v4())),
      Value::Text(rec.car_park_no),
      Value::Text(rec.address),
      Value::Real(rec.x_coord),
      Value::Real(rec.y_coord),
      Value::Text(rec.short_term_parking),
      Value::Text(rec.free_parking),
      Value::Integer(i64::from(rec.night_parking)),
      Value::Integer(rec.car_park_decks),
      Value::Real(rec.gantry_height),
      Value::Integer(i64::from(rec.car_park_basement)),
      Value::Integer(rec.car_park_type_id),
      Value::Integer(rec.parking_system_type_id),
      Value::Text(now.clone()),
      Value::Text(now.clone()),
    ]);
  }

  tx.execute(&sql, rusqlite::params_from_iter(values))
    .map_err(db_error)?;

  tracing::debug!(rows, "flushed carpark batch");
  Ok(rows)
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Load `source` into the store. All-or-nothing: on error nothing from this
/// run is persisted.
pub(crate) fn run<R: Read>(conn: &mut rusqlite::Connection, source: R) -> Result<IngestReport> {
  let tx = conn
    .transaction_with_behavior(TransactionBehavior::Immediate)
    .map_err(|e| IngestError::Transaction(e.to_string()))?;

  let mut report = IngestReport::default();
  let mut batch: Vec<CarparkRecord> = Vec::with_capacity(BATCH_SIZE);

  for item in RowSource::open(source)? {
    let (line, row) = item?;

    let (type_id, type_created) =
      resolve_ref(&tx, RefTable::CarParkType, &row.car_park_type)?;
    let (system_id, system_created) =
      resolve_ref(&tx, RefTable::ParkingSystemType, &row.type_of_parking_system)?;
    report.car_park_types_created += usize::from(type_created);
    report.parking_system_types_created += usize::from(system_created);

    batch.push(row.into_record(line, type_id, system_id)?);
    report.records += 1;

    if batch.len() >= BATCH_SIZE {
      report.batches.push(flush(&tx, &mut batch)?);
    }
  }

  if !batch.is_empty() {
    report.batches.push(flush(&tx, &mut batch)?);
  }

  tx.commit()
    .map_err(|e| IngestError::Transaction(e.to_string()))?;

  tracing::info!(
    records = report.records,
    batches = report.batches.len(),
    car_park_types_created = report.car_park_types_created,
    parking_system_types_created = report.parking_system_types_created,
    "carpark ingestion committed"
  );
  Ok(report)
}
