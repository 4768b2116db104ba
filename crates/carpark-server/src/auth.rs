//! Bearer-token auth extractor.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use carpark_core::{store::CarparkStore, user::User};

use crate::{AppState, error::Error, token::hash_token};

/// The authenticated caller. Present in a handler means the request carried
/// a token belonging to a known user.
pub struct AuthUser(pub User);

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .ok_or(Error::Unauthorized("Unauthorized"))?
    .to_str()
    .map_err(|_| Error::Unauthorized("Invalid token format"))?;

  match header_val.split_once(' ') {
    Some(("Bearer", token)) if !token.trim().is_empty() => Ok(token.trim()),
    _ => Err(Error::Unauthorized("Invalid token format")),
  }
}

impl<S> FromRequestParts<AppState<S>> for AuthUser
where
  S: CarparkStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let hash = hash_token(bearer_token(&parts.headers)?);
    let user = state
      .store
      .find_user_by_token_hash(&hash)
      .await
      .map_err(Error::store)?
      .ok_or(Error::Forbidden)?;
    Ok(AuthUser(user))
  }
}
