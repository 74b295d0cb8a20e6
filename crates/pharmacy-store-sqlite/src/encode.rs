//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`,
//! prices as whole cents and positions by name.

use chrono::{DateTime, NaiveDate, Utc};
use pharmacy_core::{
  medicine::{Medicine, price_from_cents},
  user::{Credentials, Position, Session, User, UserDetails},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Position ────────────────────────────────────────────────────────────────

pub fn decode_position(s: &str) -> Result<Position> {
  s.parse().map_err(|_| Error::Corrupt {
    column: "user_details.position",
    value:  s.to_owned(),
  })
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// A `users ⋈ user_details` row before decoding.
pub struct RawUser {
  pub id:           i64,
  pub username:     String,
  pub created_at:   String,
  pub details_id:   i64,
  pub user_id:      i64,
  pub first_name:   String,
  pub second_name:  String,
  pub email:        String,
  pub phone_number: String,
  pub position:     String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         self.id,
      username:   self.username,
      created_at: decode_dt(&self.created_at)?,
      details:    UserDetails {
        id:           self.details_id,
        user_id:      self.user_id,
        first_name:   self.first_name,
        second_name:  self.second_name,
        email:        self.email,
        phone_number: self.phone_number,
        position:     decode_position(&self.position)?,
      },
    })
  }
}

pub struct RawCredentials {
  pub user_id:         i64,
  pub username:        String,
  pub password_hash:   String,
  pub session_token:   String,
  pub token_issued_at: String,
  pub position:        String,
}

impl RawCredentials {
  pub fn into_credentials(self) -> Result<Credentials> {
    Ok(Credentials {
      user_id:         self.user_id,
      username:        self.username,
      password_hash:   self.password_hash,
      session_token:   self.session_token,
      token_issued_at: decode_dt(&self.token_issued_at)?,
      position:        decode_position(&self.position)?,
    })
  }
}

pub struct RawSession {
  pub user_id:   i64,
  pub position:  String,
  pub issued_at: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      user_id:   self.user_id,
      position:  decode_position(&self.position)?,
      issued_at: decode_dt(&self.issued_at)?,
    })
  }
}

/// A `medicines` row plus its join-table ids, before decoding.
pub struct RawMedicine {
  pub id:              i64,
  pub name:            String,
  pub manufacturer:    String,
  pub production_date: String,
  pub packaging:       String,
  pub price_cents:     i64,
  pub pharmacy_ids:    Vec<i64>,
}

impl RawMedicine {
  pub fn into_medicine(self) -> Result<Medicine> {
    Ok(Medicine {
      id:              self.id,
      name:            self.name,
      manufacturer:    self.manufacturer,
      production_date: decode_date(&self.production_date)?,
      packaging:       self.packaging,
      price:           price_from_cents(self.price_cents),
      pharmacy_ids:    self.pharmacy_ids,
    })
  }
}
