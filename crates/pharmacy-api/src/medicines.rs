//! Handlers for `/api/medicines` endpoints. Gated on
//! [`Position::Seller`] by the router.
//!
//! Writes carry the full list of stocking pharmacies. An unknown pharmacy id
//! or a negative price is a 400 and nothing is written.
//!
//! [`Position::Seller`]: pharmacy_core::user::Position::Seller

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use pharmacy_core::{
  medicine::{Medicine, NewMedicine},
  store::PharmacyStore,
};

use crate::{AppState, error::ApiError};

fn not_found() -> ApiError { ApiError::NotFound("Medicine not found".to_owned()) }

/// Reject inputs the store would refuse anyway, before a transaction opens.
fn validate(body: &NewMedicine) -> Result<(), ApiError> {
  if body.name.trim().is_empty() {
    return Err(ApiError::Validation("Medicine name must not be empty".to_owned()));
  }
  body.price_cents()?;
  Ok(())
}

/// `GET /api/medicines`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Medicine>>, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  let medicines = state
    .store
    .list_medicines()
    .await
    .map_err(ApiError::store("failed to list medicines"))?;
  Ok(Json(medicines))
}

/// `GET /api/medicines/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<Medicine>, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .get_medicine(id)
    .await
    .map_err(ApiError::store("failed to load medicine"))?
    .map(Json)
    .ok_or_else(not_found)
}

/// `POST /api/medicines`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  WithRejection(Json(body), _): WithRejection<Json<NewMedicine>, ApiError>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  validate(&body)?;
  let medicine = state
    .store
    .create_medicine(body)
    .await
    .map_err(ApiError::store("failed to create medicine"))?;
  tracing::info!(
    medicine_id = medicine.id,
    pharmacies = medicine.pharmacy_ids.len(),
    "medicine created"
  );
  Ok((StatusCode::CREATED, Json(medicine)))
}

/// `PUT /api/medicines/{id}`: replaces the row and its pharmacy links.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
  WithRejection(Json(body), _): WithRejection<Json<NewMedicine>, ApiError>,
) -> Result<Json<Medicine>, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  validate(&body)?;
  state
    .store
    .update_medicine(id, body)
    .await
    .map_err(ApiError::store("failed to update medicine"))?
    .map(Json)
    .ok_or_else(not_found)
}

/// `DELETE /api/medicines/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<StatusCode, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  let deleted = state
    .store
    .delete_medicine(id)
    .await
    .map_err(ApiError::store("failed to delete medicine"))?;
  if !deleted {
    return Err(not_found());
  }
  tracing::info!(medicine_id = id, "medicine deleted");
  Ok(StatusCode::NO_CONTENT)
}
