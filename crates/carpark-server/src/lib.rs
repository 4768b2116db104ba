//! HTTP layer for the carpark service.
//!
//! Exposes an axum [`Router`] serving the JSON API under `/api`, backed by any
//! [`CarparkStore`]. Every `/api` route requires a bearer token.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod token;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use carpark_core::store::CarparkStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{carparks, favorites, upload};

// ─── Configuration ────────────────────────────────────────────────────────────

/// A user allowed to call the API. `token_hash` is the hex SHA-256 of the
/// user's bearer token (see `--generate-token`).
#[derive(Deserialize, Clone, Debug)]
pub struct UserConfig {
  pub username:   String,
  pub token_hash: String,
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `CARPARK_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  pub store_path:       PathBuf,
  /// CSV loaded once at startup; any failure aborts startup.
  #[serde(default)]
  pub initial_dataset:  Option<PathBuf>,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes: usize,
  #[serde(default)]
  pub users:            Vec<UserConfig>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 3000 }

fn default_max_upload_bytes() -> usize { 16 * 1024 * 1024 }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CarparkStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the server.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CarparkStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let upload_limit = state.config.max_upload_bytes;

  let api = Router::new()
    .route("/carparks",                get(carparks::list::<S>))
    .route("/carparks/favorites",      get(favorites::list::<S>))
    .route(
      "/carparks/upload",
      post(upload::handler::<S>).layer(DefaultBodyLimit::max(upload_limit)),
    )
    .route("/carparks/{id}",           get(carparks::get_one::<S>))
    .route(
      "/carparks/{id}/favorite",
      post(favorites::add::<S>).delete(favorites::remove::<S>),
    );

  Router::new()
    .route("/health", get(handlers::health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::{io::Cursor, sync::Arc};

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use carpark_store_sqlite::SqliteStore;
  use serde_json::Value;
  use tower::ServiceExt as _;

  use crate::token::hash_token;

  const TOKEN: &str = "test-token";

  const HEADER: &str = "car_park_no,address,x_coord,y_coord,short_term_parking,free_parking,night_parking,car_park_decks,gantry_height,car_park_basement,car_park_type,type_of_parking_system";

  fn sample_csv() -> String {
    format!(
      "{HEADER}\n\
       ACB,BLK 270/271 ALBERT CENTRE,30314.79,31490.49,WHOLE DAY,NO,YES,1,1.80,Y,BASEMENT CAR PARK,ELECTRONIC PARKING\n\
       ACM,BLK 98A ALJUNIED CRESCENT,33758.41,33695.52,WHOLE DAY,SUN & PH FR 7AM-10.30PM,YES,5,2.10,N,MULTI-STOREY CAR PARK,ELECTRONIC PARKING\n\
       AH1,BLK 101 JALAN DUSUN,29257.72,34500.36,WHOLE DAY,SUN & PH FR 7AM-10.30PM,NO,0,0.00,N,SURFACE CAR PARK,COUPON PARKING\n"
    )
  }

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.upsert_user("alice", &hash_token(TOKEN)).await.unwrap();
    store
      .ingest(Cursor::new(sample_csv().into_bytes()))
      .await
      .unwrap();

    AppState {
      store:  Arc::new(store),
      config: Arc::new(ServerConfig {
        host:             "127.0.0.1".to_string(),
        port:             3000,
        store_path:       PathBuf::from(":memory:"),
        initial_dataset:  None,
        max_upload_bytes: default_max_upload_bytes(),
        users:            vec![],
      }),
    }
  }

  fn bearer() -> String { format!("Bearer {TOKEN}") }

  async fn oneshot_raw(
    state:   AppState<SqliteStore>,
    method:  &str,
    uri:     &str,
    headers: Vec<(header::HeaderName, &str)>,
    body:    Body,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(body).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn authed(
    state:  AppState<SqliteStore>,
    method: &str,
    uri:    &str,
  ) -> axum::response::Response {
    let auth = bearer();
    oneshot_raw(
      state,
      method,
      uri,
      vec![(header::AUTHORIZATION, auth.as_str())],
      Body::empty(),
    )
    .await
  }

  async fn json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn carpark_id(state: &AppState<SqliteStore>, code: &str) -> String {
    state
      .store
      .get_carpark_by_code(code)
      .await
      .unwrap()
      .unwrap()
      .id
      .to_string()
  }

  fn multipart(file_name: &str, content_type: &str, data: &str) -> (String, Body) {
    let boundary = "carpark-test-boundary";
    let body = format!(
      "--{boundary}\r\n\
       Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
       Content-Type: {content_type}\r\n\r\n\
       {data}\r\n\
       --{boundary}--\r\n"
    );
    (format!("multipart/form-data; boundary={boundary}"), Body::from(body))
  }

  async fn upload(
    state:        AppState<SqliteStore>,
    file_name:    &str,
    content_type: &str,
    data:         &str,
  ) -> axum::response::Response {
    let auth = bearer();
    let (ct, body) = multipart(file_name, content_type, data);
    oneshot_raw(
      state,
      "POST",
      "/api/carparks/upload",
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, ct.as_str()),
      ],
      body,
    )
    .await
  }

  // ── Health & auth ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_needs_no_auth() {
    let state = make_state().await;
    let resp  = oneshot_raw(state, "GET", "/health", vec![], Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn missing_token_returns_401() {
    let state = make_state().await;
    let resp  = oneshot_raw(state, "GET", "/api/carparks", vec![], Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
    assert_eq!(json(resp).await["error"], "Unauthorized");
  }

  #[tokio::test]
  async fn malformed_authorization_returns_401() {
    let state = make_state().await;
    let resp  = oneshot_raw(
      state,
      "GET",
      "/api/carparks",
      vec![(header::AUTHORIZATION, "Token abc")],
      Body::empty(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(resp).await["error"], "Invalid token format");
  }

  #[tokio::test]
  async fn unknown_token_returns_403() {
    let state = make_state().await;
    let resp  = oneshot_raw(
      state,
      "GET",
      "/api/carparks",
      vec![(header::AUTHORIZATION, "Bearer nope")],
      Body::empty(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  // ── Listing ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn list_returns_page_envelope() {
    let state = make_state().await;
    let resp  = authed(state, "GET", "/api/carparks").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json(resp).await;
    assert_eq!(body["totalItems"], 3);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["carparks"].as_array().unwrap().len(), 3);
    assert_eq!(body["carparks"][0]["car_park_no"], "ACB");
    assert_eq!(body["carparks"][0]["car_park_type"]["name"], "BASEMENT CAR PARK");
  }

  #[tokio::test]
  async fn list_applies_filters() {
    let state = make_state().await;
    let resp  = authed(
      state,
      "GET",
      "/api/carparks?freeParking=true&nightParking=true&minHeight=2",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json(resp).await;
    assert_eq!(body["totalItems"], 1);
    assert_eq!(body["carparks"][0]["car_park_no"], "ACM");
  }

  #[tokio::test]
  async fn list_paginates() {
    let state = make_state().await;
    let resp  = authed(state, "GET", "/api/carparks?page=2&limit=2").await;
    let body  = json(resp).await;
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 2);
    assert_eq!(body["carparks"].as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn list_rejects_bad_params() {
    for uri in [
      "/api/carparks?minHeight=tall",
      "/api/carparks?limit=0",
      "/api/carparks?page=0",
      "/api/carparks?limit=1000",
    ] {
      let state = make_state().await;
      let resp  = authed(state, "GET", uri).await;
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
      assert!(json(resp).await["error"].is_string());
    }
  }

  #[tokio::test]
  async fn bad_min_height_has_one_message() {
    for uri in ["/api/carparks?minHeight=tall", "/api/carparks?minHeight=NaN"] {
      let state = make_state().await;
      let resp  = authed(state, "GET", uri).await;
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
      assert_eq!(json(resp).await["error"], "Invalid minHeight value", "{uri}");
    }
  }

  #[tokio::test]
  async fn get_one_found_missing_and_malformed() {
    let state = make_state().await;
    let id    = carpark_id(&state, "AH1").await;

    let resp = authed(state.clone(), "GET", &format!("/api/carparks/{id}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json(resp).await["address"], "BLK 101 JALAN DUSUN");

    let resp = authed(
      state.clone(),
      "GET",
      &format!("/api/carparks/{}", uuid::Uuid::new_v4()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = authed(state, "GET", "/api/carparks/not-a-uuid").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Favorites ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn favorite_add_list_remove() {
    let state = make_state().await;
    let id    = carpark_id(&state, "ACM").await;
    let path  = format!("/api/carparks/{id}/favorite");

    let resp = authed(state.clone(), "POST", &path).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["message"], "Added to favorites");
    assert_eq!(body["user"]["username"], "alice");

    // Adding twice is harmless.
    let resp = authed(state.clone(), "POST", &path).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = authed(state.clone(), "GET", "/api/carparks/favorites").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["user"]["username"], "alice");
    let favs = body["favorites"].as_array().unwrap();
    assert_eq!(favs.len(), 1);
    assert_eq!(favs[0]["car_park_no"], "ACM");

    let resp = authed(state.clone(), "DELETE", &path).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = authed(state, "DELETE", &path).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn favorite_unknown_carpark_returns_404() {
    let state = make_state().await;
    let resp  = authed(
      state,
      "POST",
      &format!("/api/carparks/{}/favorite", uuid::Uuid::new_v4()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(resp).await["error"], "Carpark not found");
  }

  // ── Upload ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn upload_ingests_csv() {
    let state = make_state().await;
    let data  = format!(
      "{HEADER}\n\
       ACB,RENAMED,30314.79,31490.49,WHOLE DAY,NO,YES,1,1.80,Y,BASEMENT CAR PARK,ELECTRONIC PARKING\n\
       NEW1,BLK 1 NEW STREET,1.0,2.0,WHOLE DAY,NO,NO,3,4.50,N,COVERED CAR PARK,ELECTRONIC PARKING\n"
    );

    let resp = upload(state.clone(), "update.csv", "text/csv", &data).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["message"], "CSV file processed successfully");
    assert_eq!(body["records"], 2);

    let acb = state.store.get_carpark_by_code("ACB").await.unwrap().unwrap();
    assert_eq!(acb.address, "RENAMED");
    assert!(state.store.get_carpark_by_code("NEW1").await.unwrap().is_some());

    let resp = authed(state, "GET", "/api/carparks").await;
    assert_eq!(json(resp).await["totalItems"], 4);
  }

  #[tokio::test]
  async fn upload_rejects_non_csv() {
    let state = make_state().await;
    let resp  = upload(state.clone(), "data.json", "application/json", "{}").await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let resp = upload(state, "data.txt", "text/csv", "x").await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
  }

  #[tokio::test]
  async fn upload_without_file_field_returns_400() {
    let state    = make_state().await;
    let auth     = bearer();
    let boundary = "carpark-test-boundary";
    let body     = format!(
      "--{boundary}\r\n\
       Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
       hello\r\n\
       --{boundary}--\r\n"
    );
    let ct = format!("multipart/form-data; boundary={boundary}");
    let resp = oneshot_raw(
      state,
      "POST",
      "/api/carparks/upload",
      vec![
        (header::AUTHORIZATION, auth.as_str()),
        (header::CONTENT_TYPE, ct.as_str()),
      ],
      Body::from(body),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(resp).await["error"], "No file uploaded");
  }

  #[tokio::test]
  async fn upload_with_bad_row_returns_400_and_changes_nothing() {
    let state = make_state().await;
    let data  = format!(
      "{HEADER}\n\
       ACB,RENAMED,30314.79,31490.49,WHOLE DAY,NO,YES,1,1.80,Y,BASEMENT CAR PARK,ELECTRONIC PARKING\n\
       BAD,BLK 2,1.0,2.0,WHOLE DAY,NO,NO,three,4.50,N,COVERED CAR PARK,ELECTRONIC PARKING\n"
    );

    let resp = upload(state.clone(), "broken.csv", "text/csv", &data).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err = json(resp).await["error"].as_str().unwrap().to_owned();
    assert!(err.contains("car_park_decks"), "error: {err}");

    let acb = state.store.get_carpark_by_code("ACB").await.unwrap().unwrap();
    assert_eq!(acb.address, "BLK 270/271 ALBERT CENTRE");
    assert!(state.store.get_carpark_by_code("BAD").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn upload_requires_auth() {
    let state     = make_state().await;
    let (ct, body) = multipart("a.csv", "text/csv", &sample_csv());
    let resp = oneshot_raw(
      state,
      "POST",
      "/api/carparks/upload",
      vec![(header::CONTENT_TYPE, ct.as_str())],
      body,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }
}
