//! `POST /carparks/upload`: replace/insert carparks from a CSV upload.
//!
//! The multipart field `file` must declare a CSV MIME type and carry a `.csv`
//! file name. The body is ingested straight from memory; nothing is written
//! to disk.

use std::{io::Cursor, path::Path};

use axum::{
  Json,
  extract::{
    Multipart, State,
    multipart::{MultipartError, MultipartRejection},
  },
  http::StatusCode,
};
use bytes::Bytes;
use carpark_core::{ingest::IngestReport, store::CarparkStore};
use serde::Serialize;

use crate::{AppState, auth::AuthUser, error::Error};

const ALLOWED_MIME_TYPES: [&str; 2] = ["text/csv", "application/csv"];
const ALLOWED_EXTENSION: &str = "csv";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
  pub message: &'static str,
  #[serde(flatten)]
  pub report:  IngestReport,
}

fn multipart_error(e: MultipartError) -> Error {
  if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
    Error::PayloadTooLarge
  } else {
    Error::BadRequest(e.body_text())
  }
}

fn check_file_type(content_type: Option<&str>, file_name: Option<&str>) -> Result<(), Error> {
  let unsupported = || Error::UnsupportedMediaType("Only .csv files are supported".into());

  let mime = content_type
    .and_then(|ct| ct.split(';').next())
    .map(|ct| ct.trim().to_ascii_lowercase())
    .ok_or_else(unsupported)?;
  if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
    return Err(unsupported());
  }

  let has_csv_extension = file_name
    .and_then(|name| Path::new(name).extension())
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| ext.eq_ignore_ascii_case(ALLOWED_EXTENSION));
  if !has_csv_extension {
    return Err(unsupported());
  }
  Ok(())
}

/// `POST /carparks/upload`: multipart body with a `file` field.
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, Error>
where
  S: CarparkStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut multipart = multipart.map_err(|e| Error::BadRequest(e.body_text()))?;

  let mut upload: Option<Bytes> = None;
  while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
    if field.name() != Some("file") {
      continue;
    }
    check_file_type(field.content_type(), field.file_name())?;
    upload = Some(field.bytes().await.map_err(multipart_error)?);
    break;
  }
  let data = upload.ok_or_else(|| Error::BadRequest("No file uploaded".into()))?;

  let size = data.len();
  let report = state
    .store
    .ingest(Cursor::new(data))
    .await
    .map_err(Error::store)?;

  tracing::info!(
    user = %user.username,
    bytes = size,
    records = report.records,
    "processed CSV upload"
  );

  Ok(Json(UploadResponse {
    message: "CSV file processed successfully",
    report,
  }))
}
