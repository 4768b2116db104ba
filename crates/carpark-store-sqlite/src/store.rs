//! [`SqliteStore`]: the SQLite implementation of [`CarparkStore`].

use std::{io::Read, path::Path};

use carpark_core::{
  carpark::{Carpark, CarparkPage, CarparkQuery, TypeRef},
  ingest::{IngestError, IngestReport},
  store::CarparkStore,
  user::{Favorite, User},
};
use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawCarpark, RawFavorite, RawUser, SELECT_CARPARK, encode_dt, encode_uuid},
  ingest,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A carpark store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every call,
/// including a whole ingestion run, executes on the connection's single
/// worker thread, so concurrent ingestions through one store are serialized.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Ingest the CSV file at `path`. Failing to open the file is reported as
  /// [`IngestError::Stream`].
  pub async fn ingest_path(&self, path: impl AsRef<Path>) -> Result<IngestReport> {
    let path = path.as_ref().to_path_buf();
    self
      .conn
      .call(move |conn| {
        Ok(
          std::fs::File::open(&path)
            .map_err(|e| Error::Ingest(IngestError::Stream(e)))
            .and_then(|file| ingest::run(conn, file)),
        )
      })
      .await?
  }

  async fn list_type_refs(&self, table: &'static str) -> Result<Vec<TypeRef>> {
    let refs = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!("SELECT id, name FROM {table} ORDER BY id"))?;
        let rows = stmt
          .query_map([], |row| Ok(TypeRef { id: row.get(0)?, name: row.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(refs)
  }
}

// ─── CarparkStore impl ───────────────────────────────────────────────────────

impl CarparkStore for SqliteStore {
  type Error = Error;

  // ── Ingestion ─────────────────────────────────────────────────────────────

  async fn ingest<R>(&self, source: R) -> Result<IngestReport>
  where
    R: Read + Send + 'static,
  {
    self
      .conn
      .call(move |conn| Ok(ingest::run(conn, source)))
      .await?
  }

  // ── Carparks ──────────────────────────────────────────────────────────────

  async fn list_carparks(&self, query: &CarparkQuery) -> Result<CarparkPage> {
    query.validate()?;

    let mut conds: Vec<&'static str> = vec![];
    let mut args: Vec<Value> = vec![];
    match query.free_parking {
      Some(true) => conds.push("c.free_parking != 'NO'"),
      Some(false) => conds.push("c.free_parking = 'NO'"),
      None => {}
    }
    if let Some(night) = query.night_parking {
      conds.push("c.night_parking = ?");
      args.push(Value::Integer(i64::from(night)));
    }
    if let Some(height) = query.min_height {
      conds.push("c.gantry_height >= ?");
      args.push(Value::Real(height));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let limit_val  = i64::from(query.limit);
    let offset_val = i64::try_from(query.offset()).unwrap_or(i64::MAX);

    let (total, raws): (i64, Vec<RawCarpark>) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM carparks c {where_clause}"),
          rusqlite::params_from_iter(args.iter()),
          |r| r.get(0),
        )?;

        let mut page_args = args;
        page_args.push(Value::Integer(limit_val));
        page_args.push(Value::Integer(offset_val));

        let mut stmt = conn.prepare(&format!(
          "{SELECT_CARPARK} {where_clause} ORDER BY c.car_park_no LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(page_args), RawCarpark::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, rows))
      })
      .await?;

    let carparks = raws
      .into_iter()
      .map(RawCarpark::into_carpark)
      .collect::<Result<Vec<_>>>()?;

    Ok(CarparkPage::new(query, total.max(0) as u64, carparks))
  }

  async fn get_carpark(&self, id: Uuid) -> Result<Option<Carpark>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCarpark> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{SELECT_CARPARK} WHERE c.carpark_id = ?1"),
              rusqlite::params![id_str],
              RawCarpark::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCarpark::into_carpark).transpose()
  }

  async fn get_carpark_by_code(&self, car_park_no: &str) -> Result<Option<Carpark>> {
    let code = car_park_no.to_owned();

    let raw: Option<RawCarpark> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{SELECT_CARPARK} WHERE c.car_park_no = ?1"),
              rusqlite::params![code],
              RawCarpark::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCarpark::into_carpark).transpose()
  }

  async fn list_car_park_types(&self) -> Result<Vec<TypeRef>> {
    self.list_type_refs("car_park_types").await
  }

  async fn list_parking_system_types(&self) -> Result<Vec<TypeRef>> {
    self.list_type_refs("parking_system_types").await
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, username: &str, token_hash: &str) -> Result<User> {
    let id_str   = encode_uuid(Uuid::new_v4());
    let name     = username.to_owned();
    let hash     = token_hash.to_owned();
    let at_str   = encode_dt(Utc::now());

    let raw: RawUser = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, token_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(username) DO UPDATE SET token_hash = excluded.token_hash",
          rusqlite::params![id_str, name, hash, at_str],
        )?;
        Ok(conn.query_row(
          "SELECT user_id, username, created_at FROM users WHERE username = ?1",
          rusqlite::params![name],
          RawUser::from_row,
        )?)
      })
      .await?;

    raw.into_user()
  }

  async fn find_user_by_token_hash(&self, token_hash: &str) -> Result<Option<User>> {
    let hash = token_hash.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, username, created_at FROM users WHERE token_hash = ?1",
              rusqlite::params![hash],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Favorites ─────────────────────────────────────────────────────────────

  async fn add_favorite(&self, user_id: Uuid, carpark_id: Uuid) -> Result<Option<Favorite>> {
    let user_str    = encode_uuid(user_id);
    let carpark_str = encode_uuid(carpark_id);
    let at_str      = encode_dt(Utc::now());

    let raw: Option<RawFavorite> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists = tx
          .query_row(
            "SELECT 1 FROM carparks WHERE carpark_id = ?1",
            rusqlite::params![carpark_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }

        tx.execute(
          "INSERT INTO favorites (user_id, carpark_id, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(user_id, carpark_id) DO NOTHING",
          rusqlite::params![user_str, carpark_str, at_str],
        )?;
        let raw = tx.query_row(
          "SELECT user_id, carpark_id, created_at FROM favorites
           WHERE user_id = ?1 AND carpark_id = ?2",
          rusqlite::params![user_str, carpark_str],
          |row| {
            Ok(RawFavorite {
              user_id:    row.get(0)?,
              carpark_id: row.get(1)?,
              created_at: row.get(2)?,
            })
          },
        )?;

        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawFavorite::into_favorite).transpose()
  }

  async fn remove_favorite(&self, user_id: Uuid, carpark_id: Uuid) -> Result<bool> {
    let user_str    = encode_uuid(user_id);
    let carpark_str = encode_uuid(carpark_id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM favorites WHERE user_id = ?1 AND carpark_id = ?2",
          rusqlite::params![user_str, carpark_str],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }

  async fn list_favorites(&self, user_id: Uuid) -> Result<Vec<Carpark>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawCarpark> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{SELECT_CARPARK}
           JOIN favorites f ON f.carpark_id = c.carpark_id
           WHERE f.user_id = ?1
           ORDER BY f.created_at, c.car_park_no"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], RawCarpark::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCarpark::into_carpark).collect()
  }
}
