//! JSON REST API for the pharmacy registry.
//!
//! Exposes an axum [`Router`] backed by any [`PharmacyStore`]. User routes
//! are open; pharmacy and medicine routes sit behind the session gate in
//! [`gate`].

pub mod credentials;
pub mod error;
pub mod gate;
pub mod medicines;
pub mod metrics;
pub mod pharmacies;
pub mod settings;
pub mod users;

pub use error::ApiError;
pub use settings::ServerConfig;

use std::sync::Arc;

use axum::{
  Router,
  http::{Method, header},
  middleware,
  routing::{get, post},
};
use pharmacy_core::{store::PharmacyStore, user::Position};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use gate::Gate;
use metrics::Metrics;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: PharmacyStore> {
  pub store:   Arc<S>,
  pub config:  Arc<ServerConfig>,
  pub metrics: Arc<Metrics>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
///
/// The CORS layer is outermost, so every `OPTIONS` request is answered with
/// an empty 200 before authentication or routing.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  let seller = Gate { state: state.clone(), required: Position::Seller };

  let inventory = Router::new()
    // Pharmacies
    .route("/api/pharmacies", get(pharmacies::list::<S>).post(pharmacies::create::<S>))
    .route(
      "/api/pharmacies/{id}",
      get(pharmacies::get_one::<S>)
        .put(pharmacies::update::<S>)
        .delete(pharmacies::delete_one::<S>),
    )
    // Medicines
    .route("/api/medicines", get(medicines::list::<S>).post(medicines::create::<S>))
    .route(
      "/api/medicines/{id}",
      get(medicines::get_one::<S>)
        .put(medicines::update::<S>)
        .delete(medicines::delete_one::<S>),
    )
    .route_layer(middleware::from_fn_with_state(seller, gate::require_position::<S>));

  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

  Router::new()
    // Users
    .route("/api/users", get(users::list::<S>).post(users::create::<S>))
    .route("/api/users/login", post(users::login::<S>))
    .route(
      "/api/users/{id}",
      get(users::get_one::<S>)
        .put(users::update::<S>)
        .delete(users::delete_one::<S>),
    )
    .route("/metrics", get(metrics::handler::<S>))
    .merge(inventory)
    .layer(middleware::from_fn_with_state(state.clone(), metrics::track::<S>))
    .layer(TraceLayer::new_for_http())
    .layer(cors)
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;

  use axum::{
    body::Body,
    http::{HeaderValue, StatusCode},
    response::Response,
  };
  use chrono::Utc;
  use pharmacy_core::user::{NewUser, NewUserDetails};
  use pharmacy_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn make_state(session_ttl_hours: i64) -> AppState<SqliteStore> {
    AppState {
      store:   Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      config:  Arc::new(ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        data_dir: PathBuf::from("."),
        db_name: "pharmacy_test".to_string(),
        session_ttl_hours,
      }),
      metrics: Arc::new(Metrics::new().unwrap()),
    }
  }

  /// Insert a user straight into the store and return their session token.
  async fn seed_user(state: &AppState<SqliteStore>, position: Position) -> String {
    let token = uuid::Uuid::new_v4().to_string();
    state
      .store
      .create_user(NewUser {
        username:        format!("{position}-{token}"),
        password_hash:   "unused".into(),
        session_token:   token.clone(),
        token_issued_at: Utc::now(),
        details:         NewUserDetails {
          first_name:   "Test".into(),
          second_name:  "User".into(),
          email:        "test@example.test".into(),
          phone_number: "555-0100".into(),
          position,
        },
      })
      .await
      .unwrap();
    token
  }

  async fn send(
    state:  &AppState<SqliteStore>,
    method: Method,
    uri:    &str,
    token:  Option<&str>,
    body:   Option<Value>,
  ) -> Response {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::COOKIE, format!("auth_token={token}"));
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    router(state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap()
  }

  async fn json_body(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn cookie_token(res: &Response) -> String {
    let raw = res
      .headers()
      .get(header::SET_COOKIE)
      .expect("Set-Cookie header")
      .to_str()
      .unwrap();
    assert!(raw.contains("HttpOnly"), "cookie should be HttpOnly: {raw}");
    raw
      .split(';')
      .next()
      .and_then(|pair| pair.strip_prefix("auth_token="))
      .expect("auth_token cookie")
      .to_string()
  }

  fn user_body(username: &str, position: &str) -> Value {
    json!({
      "username": username,
      "password": "pw123",
      "details": {
        "first_name": "Alice",
        "second_name": "Smith",
        "email": "alice@example.test",
        "phone_number": "555-0101",
        "position": position,
      }
    })
  }

  fn pharmacy_body(name: &str) -> Value {
    json!({
      "name": name,
      "address": { "street": "1 Main St", "city": "Springfield", "country": "US" }
    })
  }

  fn medicine_body(pharmacy_ids: &[i64]) -> Value {
    json!({
      "name": "Aspirin",
      "manufacturer": "Bayer",
      "production_date": "2024-05-17",
      "packaging": "Box of 20",
      "price": 7.25,
      "pharmacy_ids": pharmacy_ids,
    })
  }

  // ── Users ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_then_login() {
    let state = make_state(24).await;

    let res = send(&state, Method::POST, "/api/users", None, Some(user_body("alice", "Seller"))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let created_token = cookie_token(&res);
    let user = json_body(res).await;
    assert!(user["id"].as_i64().unwrap() > 0);
    assert!(user["created_at"].is_string());
    assert_eq!(user["details"]["position"], "Seller");
    assert!(user.get("password_hash").is_none());

    let res = send(
      &state,
      Method::POST,
      "/api/users/login",
      None,
      Some(json!({ "username": "alice", "password": "pw123" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(cookie_token(&res), created_token);
    let body = json_body(res).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["position"], "Seller");
    assert_eq!(body["id"], user["id"]);
  }

  #[tokio::test]
  async fn invalid_position_writes_nothing() {
    let state = make_state(24).await;

    let res = send(&state, Method::POST, "/api/users", None, Some(user_body("bob", "Admin"))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await, json!({ "message": "Invalid position" }));

    let res = send(&state, Method::GET, "/api/users", None, None).await;
    assert_eq!(json_body(res).await, json!([]));
  }

  #[tokio::test]
  async fn login_failures_are_indistinguishable() {
    let state = make_state(24).await;
    send(&state, Method::POST, "/api/users", None, Some(user_body("carol", "Buyer"))).await;

    let wrong_password = send(
      &state,
      Method::POST,
      "/api/users/login",
      None,
      Some(json!({ "username": "carol", "password": "nope" })),
    )
    .await;
    let unknown_user = send(
      &state,
      Method::POST,
      "/api/users/login",
      None,
      Some(json!({ "username": "nobody", "password": "pw123" })),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let a = axum::body::to_bytes(wrong_password.into_body(), usize::MAX).await.unwrap();
    let b = axum::body::to_bytes(unknown_user.into_body(), usize::MAX).await.unwrap();
    assert_eq!(a, b);
  }

  #[tokio::test]
  async fn login_replaces_stale_session() {
    let state = make_state(0).await;

    let res = send(&state, Method::POST, "/api/users", None, Some(user_body("dave", "Seller"))).await;
    let first = cookie_token(&res);

    let res = send(
      &state,
      Method::POST,
      "/api/users/login",
      None,
      Some(json!({ "username": "dave", "password": "pw123" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_ne!(cookie_token(&res), first);
  }

  #[tokio::test]
  async fn user_lifecycle() {
    let state = make_state(24).await;
    let res = send(&state, Method::POST, "/api/users", None, Some(user_body("erin", "Buyer"))).await;
    let id = json_body(res).await["id"].as_i64().unwrap();
    let uri = format!("/api/users/{id}");

    let mut update = user_body("erin2", "Developer");
    update.as_object_mut().unwrap().remove("password");
    let res = send(&state, Method::PUT, &uri, None, Some(update)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = json_body(res).await;
    assert_eq!(updated["username"], "erin2");
    assert_eq!(updated["details"]["position"], "Developer");

    let res = send(&state, Method::DELETE, &uri, None, None).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = send(&state, Method::GET, &uri, None, None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await, json!({ "message": "User not found" }));
  }

  #[tokio::test]
  async fn bad_ids_and_bodies_are_400() {
    let state = make_state(24).await;

    let res = send(&state, Method::GET, "/api/users/abc", None, None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await, json!({ "message": "Invalid ID" }));

    let req = axum::http::Request::builder()
      .method(Method::POST)
      .uri("/api/users")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{not json"))
      .unwrap();
    let res = router(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let message = json_body(res).await["message"].as_str().unwrap().to_owned();
    assert!(message.starts_with("Invalid input"));
  }

  // ── Gate ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn gate_rejects_missing_and_unknown_sessions() {
    let state = make_state(24).await;

    let res = send(&state, Method::GET, "/api/pharmacies", None, None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = send(&state, Method::GET, "/api/medicines", Some("forged"), None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await, json!({ "message": "Invalid user session" }));
  }

  #[tokio::test]
  async fn gate_applies_position_rules() {
    let state = make_state(24).await;
    let seller = seed_user(&state, Position::Seller).await;
    let buyer = seed_user(&state, Position::Buyer).await;
    let developer = seed_user(&state, Position::Developer).await;

    let res = send(&state, Method::POST, "/api/pharmacies", Some(&seller), Some(pharmacy_body("Central"))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let pharmacy_id = json_body(res).await["id"].as_i64().unwrap();

    let res = send(&state, Method::POST, "/api/medicines", Some(&seller), Some(medicine_body(&[pharmacy_id]))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let medicine_id = json_body(res).await["id"].as_i64().unwrap();

    let res = send(&state, Method::GET, "/api/pharmacies", Some(&buyer), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await.as_array().unwrap().len(), 1);

    let res = send(&state, Method::POST, "/api/pharmacies", Some(&buyer), Some(pharmacy_body("Nope"))).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let pharmacy_uri = format!("/api/pharmacies/{pharmacy_id}");
    let medicine_uri = format!("/api/medicines/{medicine_id}");
    let buyer_writes = [
      (Method::PUT, &pharmacy_uri, Some(pharmacy_body("Renamed"))),
      (Method::DELETE, &pharmacy_uri, None),
      (Method::PUT, &medicine_uri, Some(medicine_body(&[pharmacy_id]))),
      (Method::DELETE, &medicine_uri, None),
    ];
    for (method, uri, body) in buyer_writes {
      let res = send(&state, method.clone(), uri, Some(&buyer), body).await;
      assert_eq!(res.status(), StatusCode::FORBIDDEN, "buyer {method} {uri}");
    }

    let res = send(&state, Method::GET, &pharmacy_uri, Some(&seller), None).await;
    assert_eq!(json_body(res).await["name"], "Central");
    let res = send(&state, Method::GET, &medicine_uri, Some(&seller), None).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = send(&state, Method::GET, "/api/medicines", Some(&developer), None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = send(&state, Method::GET, "/api/pharmacies", Some(&seller), None).await;
    assert_eq!(json_body(res).await.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn expired_sessions_are_rejected() {
    let state = make_state(0).await;
    let seller = seed_user(&state, Position::Seller).await;

    let res = send(&state, Method::GET, "/api/pharmacies", Some(&seller), None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Inventory ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn medicine_lifecycle() {
    let state = make_state(24).await;
    let seller = seed_user(&state, Position::Seller).await;

    let mut ids = Vec::new();
    for name in ["North", "South"] {
      let res = send(&state, Method::POST, "/api/pharmacies", Some(&seller), Some(pharmacy_body(name))).await;
      ids.push(json_body(res).await["id"].as_i64().unwrap());
    }

    let res = send(&state, Method::POST, "/api/medicines", Some(&seller), Some(medicine_body(&[ids[1], ids[0], ids[1]]))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = json_body(res).await;
    assert_eq!(created["price"], json!(7.25));
    assert_eq!(created["production_date"], "2024-05-17");
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(created["pharmacy_ids"], json!(sorted));

    let uri = format!("/api/medicines/{}", created["id"]);
    let res = send(&state, Method::GET, &uri, Some(&seller), None).await;
    assert_eq!(json_body(res).await, created);

    let res = send(&state, Method::PUT, &uri, Some(&seller), Some(medicine_body(&[ids[0]]))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["pharmacy_ids"], json!([ids[0]]));

    let res = send(&state, Method::DELETE, &uri, Some(&seller), None).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = send(&state, Method::GET, &uri, Some(&seller), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn medicine_with_unknown_pharmacy_is_rejected() {
    let state = make_state(24).await;
    let seller = seed_user(&state, Position::Seller).await;

    let res = send(&state, Method::POST, "/api/medicines", Some(&seller), Some(medicine_body(&[404]))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await, json!({ "message": "Pharmacy 404 does not exist" }));

    let res = send(&state, Method::GET, "/api/medicines", Some(&seller), None).await;
    assert_eq!(json_body(res).await, json!([]));
  }

  #[tokio::test]
  async fn negative_price_is_rejected() {
    let state = make_state(24).await;
    let seller = seed_user(&state, Position::Seller).await;

    let mut body = medicine_body(&[]);
    body["price"] = json!(-1.5);
    let res = send(&state, Method::POST, "/api/medicines", Some(&seller), Some(body)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn pharmacy_missing_is_404() {
    let state = make_state(24).await;
    let seller = seed_user(&state, Position::Seller).await;

    let res = send(&state, Method::GET, "/api/pharmacies/77", Some(&seller), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = send(&state, Method::DELETE, "/api/pharmacies/77", Some(&seller), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
  }

  // ── Transport ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn options_short_circuits_auth() {
    let state = make_state(24).await;
    let req = axum::http::Request::builder()
      .method(Method::OPTIONS)
      .uri("/api/medicines")
      .header(header::ORIGIN, "http://shop.example.test")
      .body(Body::empty())
      .unwrap();
    let res = router(state).oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
      res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
      Some(&HeaderValue::from_static("*"))
    );
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
  }

  #[tokio::test]
  async fn metrics_label_matched_routes() {
    let state = make_state(24).await;
    send(&state, Method::GET, "/api/users/12345", None, None).await;

    let res = send(&state, Method::GET, "/metrics", None, None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(
      r#"http_requests_total{method="GET",route="/api/users/{id}",status="404"} 1"#
    ));
  }
}
