//! Medicines and the set of pharmacies stocking them.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A medicine with its stocking pharmacies resolved from the join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
  pub id:              i64,
  pub name:            String,
  pub manufacturer:    String,
  pub production_date: NaiveDate,
  pub packaging:       String,
  /// Fixed-point with two decimal places.
  pub price:           Decimal,
  /// Ascending; derived, never stored on the medicine row.
  pub pharmacy_ids:    Vec<i64>,
}

/// Input to [`crate::store::PharmacyStore::create_medicine`] and
/// [`crate::store::PharmacyStore::update_medicine`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewMedicine {
  pub name:            String,
  pub manufacturer:    String,
  pub production_date: NaiveDate,
  pub packaging:       String,
  pub price:           Decimal,
  #[serde(default)]
  pub pharmacy_ids:    Vec<i64>,
}

impl NewMedicine {
  /// The referenced pharmacy ids with duplicates collapsed, in the order
  /// they were first given. A (pharmacy, medicine) pair is stored at most
  /// once.
  pub fn distinct_pharmacy_ids(&self) -> Vec<i64> {
    let mut seen = BTreeSet::new();
    self
      .pharmacy_ids
      .iter()
      .copied()
      .filter(|id| seen.insert(*id))
      .collect()
  }

  /// The price rounded to whole cents, halves away from zero. Negative or
  /// unrepresentable prices are rejected.
  pub fn price_cents(&self) -> crate::Result<i64> {
    use rust_decimal::prelude::ToPrimitive as _;
    if self.price < Decimal::ZERO {
      return Err(crate::Error::InvalidPrice(self.price.to_string()));
    }
    self
      .price
      .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
      .checked_mul(Decimal::ONE_HUNDRED)
      .and_then(|cents| cents.to_i64())
      .ok_or_else(|| crate::Error::InvalidPrice(self.price.to_string()))
  }
}

/// Rebuild a price from the whole-cents column.
pub fn price_from_cents(cents: i64) -> Decimal { Decimal::new(cents, 2) }

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(price: &str, pharmacy_ids: Vec<i64>) -> NewMedicine {
    NewMedicine {
      name: "Ibuprofen".into(),
      manufacturer: "Acme".into(),
      production_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
      packaging: "blister".into(),
      price: price.parse().unwrap(),
      pharmacy_ids,
    }
  }

  #[test]
  fn distinct_ids_keep_first_seen_order() {
    let m = sample("1.00", vec![3, 1, 3, 2, 1]);
    assert_eq!(m.distinct_pharmacy_ids(), vec![3, 1, 2]);
  }

  #[test]
  fn price_rounds_to_cents() {
    assert_eq!(sample("12.5", vec![]).price_cents().unwrap(), 1250);
    assert_eq!(sample("0.016", vec![]).price_cents().unwrap(), 2);
    assert_eq!(sample("0.125", vec![]).price_cents().unwrap(), 13);
    assert_eq!(sample("0.135", vec![]).price_cents().unwrap(), 14);
    assert_eq!(price_from_cents(1250).to_string(), "12.50");
  }

  #[test]
  fn negative_price_is_rejected() {
    assert!(matches!(
      sample("-1.00", vec![]).price_cents(),
      Err(crate::Error::InvalidPrice(_))
    ));
  }

  #[test]
  fn accepts_numeric_json_price() {
    let m: NewMedicine = serde_json::from_value(serde_json::json!({
      "name": "Aspirin",
      "manufacturer": "Bayer",
      "production_date": "2023-11-05",
      "packaging": "bottle",
      "price": 4.99
    }))
    .unwrap();
    assert_eq!(m.price_cents().unwrap(), 499);
    assert!(m.pharmacy_ids.is_empty());
  }
}
