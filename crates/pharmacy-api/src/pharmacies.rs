//! Handlers for `/api/pharmacies` endpoints. Gated on [`Position::Seller`]
//! by the router.
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
  pharmacy::{NewPharmacy, Pharmacy},
  store::PharmacyStore,
};

use crate::{AppState, error::ApiError};

fn not_found() -> ApiError { ApiError::NotFound("Pharmacy not found".to_owned()) }

fn validate(body: &NewPharmacy) -> Result<(), ApiError> {
  if body.name.trim().is_empty() {
    return Err(ApiError::Validation("Pharmacy name must not be empty".to_owned()));
  }
  Ok(())
}

/// `GET /api/pharmacies`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Pharmacy>>, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  let pharmacies = state
    .store
    .list_pharmacies()
    .await
    .map_err(ApiError::store("failed to list pharmacies"))?;
  Ok(Json(pharmacies))
}

/// `GET /api/pharmacies/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<Pharmacy>, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .get_pharmacy(id)
    .await
    .map_err(ApiError::store("failed to load pharmacy"))?
    .map(Json)
    .ok_or_else(not_found)
}

/// `POST /api/pharmacies`: creates the pharmacy and its address together.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  WithRejection(Json(body), _): WithRejection<Json<NewPharmacy>, ApiError>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  validate(&body)?;
  let pharmacy = state
    .store
    .create_pharmacy(body)
    .await
    .map_err(ApiError::store("failed to create pharmacy"))?;
  tracing::info!(pharmacy_id = pharmacy.id, "pharmacy created");
  Ok((StatusCode::CREATED, Json(pharmacy)))
}

/// `PUT /api/pharmacies/{id}`: replaces the name and address in place.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
  WithRejection(Json(body), _): WithRejection<Json<NewPharmacy>, ApiError>,
) -> Result<Json<Pharmacy>, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  validate(&body)?;
  state
    .store
    .update_pharmacy(id, body)
    .await
    .map_err(ApiError::store("failed to update pharmacy"))?
    .map(Json)
    .ok_or_else(not_found)
}

/// `DELETE /api/pharmacies/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<StatusCode, ApiError>
where
  S: PharmacyStore + Clone + Send + Sync + 'static,
{
  let deleted = state
    .store
    .delete_pharmacy(id)
    .await
    .map_err(ApiError::store("failed to delete pharmacy"))?;
  if !deleted {
    return Err(not_found());
  }
  tracing::info!(pharmacy_id = id, "pharmacy deleted");
  Ok(StatusCode::NO_CONTENT)
}
