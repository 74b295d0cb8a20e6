//! Cookie-session authentication and position-based authorization.
//!
//! [`require_position`] runs in front of every inventory route. It resolves
//! the `auth_token` cookie to a [`Session`], rejects stale sessions and then
//! consults [`pharmacy_core::access`] for the request's [`Access`] kind.

use axum::{
  extract::{Request, State},
  http::Method,
  middleware::Next,
  response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use pharmacy_core::{
  access::{self, Access},
  store::PharmacyStore,
  user::{Position, Session},
};

use crate::{AppState, credentials::SESSION_COOKIE, error::ApiError};

/// State handed to [`require_position`]: the application state plus the
/// position a route group demands.
#[derive(Clone)]
pub struct Gate<S: PharmacyStore> {
  pub state:    AppState<S>,
  pub required: Position,
}

/// `GET` and `HEAD` read; every other method writes.
pub fn access_for(method: &Method) -> Access {
  if method == Method::GET || method == Method::HEAD {
    Access::Read
  } else {
    Access::Write
  }
}

/// Resolve `token` and check that its holder may perform `access` on a
/// route guarded by `required`.
pub async fn authorize<S>(
  store:    &S,
  token:    Option<&str>,
  required: Position,
  access:   Access,
  ttl:      chrono::Duration,
) -> Result<Session, ApiError>
where
  S: PharmacyStore,
{
  let token = token.ok_or(ApiError::Unauthorized)?;

  let session = store
    .find_session(token)
    .await
    .map_err(ApiError::store("failed to resolve session"))?
    .ok_or(ApiError::InvalidSession)?;

  if session.is_expired(Utc::now(), ttl) {
    tracing::debug!(user_id = session.user_id, "rejected expired session");
    return Err(ApiError::InvalidSession);
  }

  if !access::permits(required, access, session.position) {
    tracing::debug!(
      user_id = session.user_id,
      position = %session.position,
      required = %required,
      ?access,
      "position not permitted"
    );
    return Err(ApiError::Forbidden);
  }

  Ok(session)
}

/// Middleware for `from_fn_with_state`. An authorized request is passed on
/// unchanged.
pub async fn require_position<S>(
  State(gate): State<Gate<S>>,
  jar: CookieJar,
  req: Request,
  next: Next,
) -> Result<Response, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  authorize(
    gate.state.store.as_ref(),
    jar.get(SESSION_COOKIE).map(Cookie::value),
    gate.required,
    access_for(req.method()),
    gate.state.config.session_ttl(),
  )
  .await?;

  Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
  use std::{path::PathBuf, sync::Arc};

  use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
  use chrono::Duration;
  use pharmacy_core::user::{NewUser, NewUserDetails};
  use pharmacy_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;
  use crate::{ServerConfig, metrics::Metrics};

  async fn store_with(position: Position, token: &str) -> SqliteStore {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .create_user(NewUser {
        username:        format!("{position}-user"),
        password_hash:   "unused".into(),
        session_token:   token.into(),
        token_issued_at: Utc::now(),
        details:         NewUserDetails {
          first_name:   "A".into(),
          second_name:  "B".into(),
          email:        "a@b.test".into(),
          phone_number: "1".into(),
          position,
        },
      })
      .await
      .unwrap();
    store
  }

  #[test]
  fn methods_map_to_access() {
    assert_eq!(access_for(&Method::GET), Access::Read);
    assert_eq!(access_for(&Method::HEAD), Access::Read);
    assert_eq!(access_for(&Method::POST), Access::Write);
    assert_eq!(access_for(&Method::PUT), Access::Write);
    assert_eq!(access_for(&Method::DELETE), Access::Write);
  }

  #[tokio::test]
  async fn missing_and_unknown_tokens() {
    let store = store_with(Position::Seller, "t").await;
    let ttl = Duration::hours(24);

    let missing = authorize(&store, None, Position::Seller, Access::Read, ttl).await;
    assert!(matches!(missing, Err(ApiError::Unauthorized)));

    let unknown =
      authorize(&store, Some("nope"), Position::Seller, Access::Read, ttl).await;
    assert!(matches!(unknown, Err(ApiError::InvalidSession)));
  }

  #[tokio::test]
  async fn buyer_reads_but_cannot_write() {
    let store = store_with(Position::Buyer, "b").await;
    let ttl = Duration::hours(24);

    let read = authorize(&store, Some("b"), Position::Seller, Access::Read, ttl).await;
    assert_eq!(read.unwrap().position, Position::Buyer);

    let write =
      authorize(&store, Some("b"), Position::Seller, Access::Write, ttl).await;
    assert!(matches!(write, Err(ApiError::Forbidden)));
  }

  #[tokio::test]
  async fn developer_is_not_a_seller() {
    let store = store_with(Position::Developer, "d").await;
    let res = authorize(
      &store,
      Some("d"),
      Position::Seller,
      Access::Read,
      Duration::hours(24),
    )
    .await;
    assert!(matches!(res, Err(ApiError::Forbidden)));
  }

  #[tokio::test]
  async fn expired_session_is_rejected() {
    let store = store_with(Position::Seller, "s").await;
    let res =
      authorize(&store, Some("s"), Position::Seller, Access::Read, Duration::zero())
        .await;
    assert!(matches!(res, Err(ApiError::InvalidSession)));
  }

  #[tokio::test]
  async fn authorized_request_reaches_handler_unchanged() {
    let state = AppState {
      store:   Arc::new(store_with(Position::Seller, "s").await),
      config:  Arc::new(ServerConfig {
        host:              "127.0.0.1".into(),
        port:              8080,
        data_dir:          PathBuf::from("."),
        db_name:           "gate_test".into(),
        session_ttl_hours: 24,
      }),
      metrics: Arc::new(Metrics::new().unwrap()),
    };
    let gate = Gate { state, required: Position::Seller };
    let app = Router::new()
      .route(
        "/",
        get(|req: Request| async move {
          format!("{}", req.extensions().get::<Session>().is_none())
        }),
      )
      .route_layer(middleware::from_fn_with_state(
        gate,
        require_position::<SqliteStore>,
      ));

    let res = app
      .oneshot(
        axum::http::Request::builder()
          .uri("/")
          .header("cookie", format!("{SESSION_COOKIE}=s"))
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"true");
  }
}
