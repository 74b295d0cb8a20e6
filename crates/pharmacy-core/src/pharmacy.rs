//! Pharmacies and their normalized postal address.

use serde::{Deserialize, Serialize};

/// A postal address owned by exactly one pharmacy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
  pub id:          i64,
  pub street:      String,
  pub city:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub postal_code: Option<String>,
  pub country:     String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pharmacy {
  pub id:      i64,
  pub name:    String,
  pub address: Address,
}

/// Address fields supplied by a caller; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAddress {
  pub street:      String,
  pub city:        String,
  #[serde(default)]
  pub state:       Option<String>,
  #[serde(default)]
  pub postal_code: Option<String>,
  pub country:     String,
}

/// Input to [`crate::store::PharmacyStore::create_pharmacy`] and
/// [`crate::store::PharmacyStore::update_pharmacy`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPharmacy {
  pub name:    String,
  pub address: NewAddress,
}
