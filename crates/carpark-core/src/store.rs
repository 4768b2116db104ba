//! The `CarparkStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `carpark-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::{future::Future, io::Read};

use uuid::Uuid;

use crate::{
  carpark::{Carpark, CarparkPage, CarparkQuery, TypeRef},
  ingest::IngestReport,
  user::{Favorite, User},
};

/// Abstraction over a carpark store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CarparkStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Ingestion ─────────────────────────────────────────────────────────

  /// Load a header-delimited CSV source into the store in one transaction.
  ///
  /// Rows are upserted on `car_park_no`; reference rows are created on first
  /// sight. Either every row is applied or, on any error, none are.
  fn ingest<R>(
    &self,
    source: R,
  ) -> impl Future<Output = Result<IngestReport, Self::Error>> + Send + '_
  where
    R: Read + Send + 'static;

  // ── Carparks ──────────────────────────────────────────────────────────

  /// Filtered, paginated listing ordered by `car_park_no`.
  fn list_carparks<'a>(
    &'a self,
    query: &'a CarparkQuery,
  ) -> impl Future<Output = Result<CarparkPage, Self::Error>> + Send + 'a;

  /// Retrieve a carpark by surrogate id. Returns `None` if not found.
  fn get_carpark(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Carpark>, Self::Error>> + Send + '_;

  /// Retrieve a carpark by its external code. Returns `None` if not found.
  fn get_carpark_by_code<'a>(
    &'a self,
    car_park_no: &'a str,
  ) -> impl Future<Output = Result<Option<Carpark>, Self::Error>> + Send + 'a;

  fn list_car_park_types(
    &self,
  ) -> impl Future<Output = Result<Vec<TypeRef>, Self::Error>> + Send + '_;

  fn list_parking_system_types(
    &self,
  ) -> impl Future<Output = Result<Vec<TypeRef>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create the user if `username` is new, otherwise replace its token hash.
  fn upsert_user<'a>(
    &'a self,
    username: &'a str,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  fn find_user_by_token_hash<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Favorites ─────────────────────────────────────────────────────────

  /// Mark a carpark as a favorite of `user_id`.
  ///
  /// Idempotent: an existing favorite is returned unchanged. Returns `None`
  /// if the carpark does not exist.
  fn add_favorite(
    &self,
    user_id: Uuid,
    carpark_id: Uuid,
  ) -> impl Future<Output = Result<Option<Favorite>, Self::Error>> + Send + '_;

  /// Returns `false` if the pair was not a favorite.
  fn remove_favorite(
    &self,
    user_id: Uuid,
    carpark_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The user's favorite carparks, oldest favorite first.
  fn list_favorites(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Carpark>, Self::Error>> + Send + '_;
}
