//! Error types and axum `IntoResponse` implementation.
//!
//! Every error renders as `{"error": "<message>"}`.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use carpark_core::ingest::IngestError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing or malformed `Authorization` header.
  #[error("{0}")]
  Unauthorized(&'static str),
  /// Well-formed token that matches no user.
  #[error("Forbidden")]
  Forbidden,
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  BadRequest(String),
  #[error("{0}")]
  UnsupportedMediaType(String),
  #[error("request body too large")]
  PayloadTooLarge,
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a store error, turning caller mistakes (bad query, bad CSV) into
  /// 400s. Everything else is a 500.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = source {
      if let Some(ingest) = e.downcast_ref::<IngestError>()
        && ingest.is_input_error()
      {
        return Error::BadRequest(ingest.to_string());
      }
      if let Some(carpark_core::Error::InvalidQuery(msg)) =
        e.downcast_ref::<carpark_core::Error>()
      {
        return Error::BadRequest(msg.clone());
      }
      source = e.source();
    }
    Error::Store(Box::new(err))
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match &self {
      Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Error::Forbidden => StatusCode::FORBIDDEN,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
      Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
      Error::Store(e) => {
        tracing::error!(error = %e, "store error");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"carpark\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Error)]
  #[error("wrapped: {0}")]
  struct Wrapper(#[source] IngestError);

  #[test]
  fn input_errors_deep_in_the_chain_become_400() {
    let err = Error::store(Wrapper(IngestError::Validation {
      line:   3,
      column: "x_coord",
      value:  "east".into(),
    }));
    assert!(matches!(err, Error::BadRequest(_)));
  }

  #[test]
  fn store_side_ingest_errors_stay_500() {
    let err = Error::store(Wrapper(IngestError::Transaction("busy".into())));
    assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn unauthorized_carries_challenge() {
    let res = Error::Unauthorized("Unauthorized").into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }
}
