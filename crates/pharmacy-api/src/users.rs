//! Handlers for `/api/users` endpoints. None of these are gated.
//!
//! | Method   | Path               | Notes                                   |
//! |----------|--------------------|-----------------------------------------|
//! | `POST`   | `/api/users`       | Creates user + details, sets the cookie |
//! | `GET`    | `/api/users`       |                                         |
//! | `POST`   | `/api/users/login` | Sets the cookie                         |
//! | `GET`    | `/api/users/{id}`  | 404 if not found                        |
//! | `PUT`    | `/api/users/{id}`  | Password optional                       |
//! | `DELETE` | `/api/users/{id}`  | 204 on success                          |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use axum_extra::extract::{CookieJar, WithRejection};
use chrono::Utc;
use pharmacy_core::{
  store::PharmacyStore,
  user::{NewUser, NewUserDetails, Position, User, UserUpdate},
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  credentials::{
    hash_password, issue_session_token, session_cookie, verify_decoy, verify_password,
  },
  error::ApiError,
};

// ─── Bodies ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DetailsBody {
  #[serde(default)]
  pub first_name:   String,
  #[serde(default)]
  pub second_name:  String,
  #[serde(default)]
  pub email:        String,
  #[serde(default)]
  pub phone_number: String,
  #[serde(default)]
  pub position:     String,
}

impl DetailsBody {
  fn validate(self) -> Result<NewUserDetails, ApiError> {
    let position = Position::parse(&self.position)
      .map_err(|_| ApiError::Validation("Invalid position".to_owned()))?;
    Ok(NewUserDetails {
      first_name: self.first_name,
      second_name: self.second_name,
      email: self.email,
      phone_number: self.phone_number,
      position,
    })
  }
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub username: String,
  pub password: String,
  pub details:  DetailsBody,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub username: String,
  pub password: Option<String>,
  pub details:  DetailsBody,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub id:       i64,
  pub username: String,
  pub position: Position,
}

fn require_username(username: &str) -> Result<(), ApiError> {
  if username.trim().is_empty() {
    return Err(ApiError::Validation("Username must not be empty".to_owned()));
  }
  Ok(())
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /api/users`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
  WithRejection(Json(body), _): WithRejection<Json<CreateBody>, ApiError>,
) -> Result<(CookieJar, Json<User>), ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  require_username(&body.username)?;
  let details = body.details.validate()?;

  let password_hash = hash_password(body.password)
    .await
    .map_err(ApiError::credentials("failed to hash password"))?;
  let session_token = issue_session_token();

  let user = state
    .store
    .create_user(NewUser {
      username: body.username,
      password_hash,
      session_token: session_token.clone(),
      token_issued_at: Utc::now(),
      details,
    })
    .await
    .map_err(ApiError::store("failed to create user"))?;

  tracing::info!(user_id = user.id, username = %user.username, "user created");
  let jar = jar.add(session_cookie(session_token, state.config.session_ttl()));
  Ok((jar, Json(user)))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /api/users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  let users = state
    .store
    .list_users()
    .await
    .map_err(ApiError::store("failed to list users"))?;
  Ok(Json(users))
}

/// `GET /api/users/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<User>, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store("failed to load user"))?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("User not found".to_owned()))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /api/users/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
  WithRejection(Json(body), _): WithRejection<Json<UpdateBody>, ApiError>,
) -> Result<Json<User>, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  require_username(&body.username)?;
  let details = body.details.validate()?;

  let password_hash = match body.password {
    Some(password) => Some(
      hash_password(password)
        .await
        .map_err(ApiError::credentials("failed to hash password"))?,
    ),
    None => None,
  };

  state
    .store
    .update_user(id, UserUpdate { username: body.username, password_hash, details })
    .await
    .map_err(ApiError::store("failed to update user"))?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("User not found".to_owned()))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /api/users/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<StatusCode, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  let deleted = state
    .store
    .delete_user(id)
    .await
    .map_err(ApiError::store("failed to delete user"))?;
  if !deleted {
    return Err(ApiError::NotFound("User not found".to_owned()));
  }
  tracing::info!(user_id = id, "user deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Login ────────────────────────────────────────────────────────────────────

/// `POST /api/users/login`
///
/// Unknown usernames and wrong passwords produce the same response after the
/// same argon2 work. A session older than the configured lifetime is
/// replaced before the cookie is issued.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
  WithRejection(Json(body), _): WithRejection<Json<LoginBody>, ApiError>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  let credentials = state
    .store
    .find_credentials(&body.username)
    .await
    .map_err(ApiError::store("failed to look up user"))?;

  let Some(credentials) = credentials else {
    tracing::debug!(username = %body.username, "login for unknown user");
    verify_decoy(body.password)
      .await
      .map_err(ApiError::credentials("failed to verify password"))?;
    return Err(ApiError::InvalidCredentials);
  };

  let matches = verify_password(credentials.password_hash.clone(), body.password)
    .await
    .map_err(ApiError::credentials("failed to verify password"))?;
  if !matches {
    tracing::debug!(user_id = credentials.user_id, "login with wrong password");
    return Err(ApiError::InvalidCredentials);
  }

  let ttl = state.config.session_ttl();
  let now = Utc::now();
  let token = if credentials.session().is_expired(now, ttl) {
    let fresh = issue_session_token();
    state
      .store
      .rotate_session(credentials.user_id, fresh.clone(), now)
      .await
      .map_err(ApiError::store("failed to rotate session"))?;
    tracing::debug!(user_id = credentials.user_id, "session rotated");
    fresh
  } else {
    credentials.session_token
  };

  let jar = jar.add(session_cookie(token, ttl));
  Ok((
    jar,
    Json(LoginResponse {
      id:       credentials.user_id,
      username: credentials.username,
      position: credentials.position,
    }),
  ))
}
