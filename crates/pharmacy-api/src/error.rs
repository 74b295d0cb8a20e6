//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves the server as `{"message": "..."}` with a status
//! picked from the variant. Persistence and credential failures are logged
//! with their cause and answered with a fixed message.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use pharmacy_core::DomainError;
use serde_json::json;
use thiserror::Error;

use crate::credentials::CredentialError;

/// An error returned by an API handler or middleware.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("Unauthorized")]
  Unauthorized,

  #[error("Invalid user session")]
  InvalidSession,

  #[error("Invalid username or password")]
  InvalidCredentials,

  #[error("Forbidden")]
  Forbidden,

  #[error("{0}")]
  NotFound(String),

  #[error("{context}")]
  Persistence {
    context: &'static str,
    #[source]
    source:  Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("{context}")]
  Credentials {
    context: &'static str,
    #[source]
    source:  CredentialError,
  },

  #[error("failed to render metrics")]
  Metrics(#[from] prometheus::Error),
}

impl ApiError {
  /// Build a mapper for store errors. Domain rejections raised inside the
  /// store (unknown pharmacy ids, bad prices) become 400s; everything else
  /// is a persistence failure described by `context`.
  pub fn store<E: DomainError>(context: &'static str) -> impl FnOnce(E) -> Self {
    move |e| match e.domain() {
      Some(domain) => ApiError::Validation(domain.to_string()),
      None => ApiError::Persistence { context, source: Box::new(e) },
    }
  }

  /// Mapper for password hashing and verification failures.
  pub fn credentials(context: &'static str) -> impl FnOnce(CredentialError) -> Self {
    move |source| ApiError::Credentials { context, source }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized
      | ApiError::InvalidSession
      | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Persistence { .. }
      | ApiError::Credentials { .. }
      | ApiError::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<pharmacy_core::Error> for ApiError {
  fn from(e: pharmacy_core::Error) -> Self { ApiError::Validation(e.to_string()) }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::Validation(format!("Invalid input: {}", rejection.body_text()))
  }
}

impl From<PathRejection> for ApiError {
  fn from(_: PathRejection) -> Self { ApiError::Validation("Invalid ID".to_owned()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match &self {
      ApiError::Persistence { context, source } => {
        tracing::error!(error = %source, "{context}");
      }
      ApiError::Credentials { context, source } => {
        tracing::error!(error = %source, "{context}");
      }
      ApiError::Metrics(e) => tracing::error!(error = %e, "failed to render metrics"),
      _ => {}
    }
    let status = self.status();
    (status, Json(json!({ "message": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Error)]
  enum FakeStoreError {
    #[error(transparent)]
    Core(#[from] pharmacy_core::Error),
    #[error("disk on fire")]
    Io,
  }

  impl DomainError for FakeStoreError {
    fn domain(&self) -> Option<&pharmacy_core::Error> {
      match self {
        FakeStoreError::Core(e) => Some(e),
        FakeStoreError::Io => None,
      }
    }
  }

  async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
    let res = err.into_response();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn domain_errors_surface_as_validation() {
    let err = ApiError::store("failed to create medicine")(FakeStoreError::Core(
      pharmacy_core::Error::PharmacyNotFound(9),
    ));
    let (status, body) = body_of(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Pharmacy 9 does not exist");
  }

  #[tokio::test]
  async fn persistence_details_are_not_leaked() {
    let err = ApiError::store("failed to list users")(FakeStoreError::Io);
    let (status, body) = body_of(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "failed to list users");
    assert!(!body.to_string().contains("disk on fire"));
  }

  #[tokio::test]
  async fn auth_failures_share_one_message() {
    let (status, body) = body_of(ApiError::InvalidCredentials).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "Invalid username or password" }));
  }
}
