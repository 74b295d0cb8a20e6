//! The `PharmacyStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `pharmacy-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.
//!
//! Every multi-row write is atomic: either all rows it touches are written or
//! none are. Lookups by id return `None` (or `false` for deletes) when the row
//! does not exist.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  error::DomainError,
  medicine::{Medicine, NewMedicine},
  pharmacy::{NewPharmacy, Pharmacy},
  user::{Credentials, NewUser, Session, User, UserUpdate},
};

/// Abstraction over a pharmacy registry backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PharmacyStore: Send + Sync {
  type Error: DomainError;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert a user and their details row in one transaction.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Update a user and their details row in one transaction.
  fn update_user(
    &self,
    id: i64,
    input: UserUpdate,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Delete the details row, then the user, in one transaction.
  fn delete_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Look up the login credentials for `username`.
  fn find_credentials<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  /// Resolve a session token to its owner and position.
  fn find_session<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + 'a;

  /// Replace a user's session token.
  fn rotate_session(
    &self,
    user_id: i64,
    token: String,
    issued_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Pharmacies ────────────────────────────────────────────────────────

  /// Insert the address and the pharmacy referencing it in one transaction.
  fn create_pharmacy(
    &self,
    input: NewPharmacy,
  ) -> impl Future<Output = Result<Pharmacy, Self::Error>> + Send + '_;

  fn get_pharmacy(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Pharmacy>, Self::Error>> + Send + '_;

  fn list_pharmacies(
    &self,
  ) -> impl Future<Output = Result<Vec<Pharmacy>, Self::Error>> + Send + '_;

  fn update_pharmacy(
    &self,
    id: i64,
    input: NewPharmacy,
  ) -> impl Future<Output = Result<Option<Pharmacy>, Self::Error>> + Send + '_;

  /// Delete a pharmacy. Its address and stocking links go with it.
  fn delete_pharmacy(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Medicines ─────────────────────────────────────────────────────────

  /// Insert a medicine and its stocking links.
  ///
  /// Fails with [`crate::Error::PharmacyNotFound`] (and writes nothing) if any
  /// referenced pharmacy does not exist.
  fn create_medicine(
    &self,
    input: NewMedicine,
  ) -> impl Future<Output = Result<Medicine, Self::Error>> + Send + '_;

  fn get_medicine(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Medicine>, Self::Error>> + Send + '_;

  fn list_medicines(
    &self,
  ) -> impl Future<Output = Result<Vec<Medicine>, Self::Error>> + Send + '_;

  /// Update a medicine's columns and replace its stocking links. Same
  /// validation as [`PharmacyStore::create_medicine`].
  fn update_medicine(
    &self,
    id: i64,
    input: NewMedicine,
  ) -> impl Future<Output = Result<Option<Medicine>, Self::Error>> + Send + '_;

  /// Delete a medicine. Its stocking links go with it.
  fn delete_medicine(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
