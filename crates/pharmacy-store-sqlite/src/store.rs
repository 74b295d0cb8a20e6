//! [`SqliteStore`], the SQLite implementation of [`PharmacyStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, Row, Transaction, params};

use pharmacy_core::{
  medicine::{Medicine, NewMedicine},
  pharmacy::{Address, NewPharmacy, Pharmacy},
  store::PharmacyStore,
  user::{Credentials, NewUser, Session, User, UserDetails, UserUpdate},
};

use crate::{
  Result,
  encode::{
    RawCredentials, RawMedicine, RawSession, RawUser, encode_date, encode_dt,
  },
  schema::SCHEMA,
};

// ─── Shared SQL ──────────────────────────────────────────────────────────────

const SELECT_USER: &str = "
  SELECT u.id, u.username, u.created_at,
         d.id, d.user_id, d.first_name, d.second_name, d.email,
         d.phone_number, d.position
  FROM users u
  JOIN user_details d ON d.user_id = u.id";

const SELECT_PHARMACY: &str = "
  SELECT p.id, p.name,
         a.id, a.street, a.city, a.state, a.postal_code, a.country
  FROM pharmacies p
  JOIN addresses a ON a.id = p.address_id";

const SELECT_MEDICINE: &str = "
  SELECT id, name, manufacturer, production_date, packaging, price_cents
  FROM medicines";

fn read_user(row: &Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    id:           row.get(0)?,
    username:     row.get(1)?,
    created_at:   row.get(2)?,
    details_id:   row.get(3)?,
    user_id:      row.get(4)?,
    first_name:   row.get(5)?,
    second_name:  row.get(6)?,
    email:        row.get(7)?,
    phone_number: row.get(8)?,
    position:     row.get(9)?,
  })
}

fn read_pharmacy(row: &Row<'_>) -> rusqlite::Result<Pharmacy> {
  Ok(Pharmacy {
    id:      row.get(0)?,
    name:    row.get(1)?,
    address: Address {
      id:          row.get(2)?,
      street:      row.get(3)?,
      city:        row.get(4)?,
      state:       row.get(5)?,
      postal_code: row.get(6)?,
      country:     row.get(7)?,
    },
  })
}

/// Read the base columns of a medicine; `pharmacy_ids` is filled in by
/// [`load_pharmacy_ids`].
fn read_medicine(row: &Row<'_>) -> rusqlite::Result<RawMedicine> {
  Ok(RawMedicine {
    id:              row.get(0)?,
    name:            row.get(1)?,
    manufacturer:    row.get(2)?,
    production_date: row.get(3)?,
    packaging:       row.get(4)?,
    price_cents:     row.get(5)?,
    pharmacy_ids:    Vec::new(),
  })
}

fn load_pharmacy_ids(
  conn: &rusqlite::Connection,
  medicine_id: i64,
) -> rusqlite::Result<Vec<i64>> {
  let mut stmt = conn.prepare_cached(
    "SELECT pharmacy_id FROM pharmacy_medicines
     WHERE medicine_id = ?1
     ORDER BY pharmacy_id",
  )?;
  stmt
    .query_map(params![medicine_id], |row| row.get(0))?
    .collect()
}

/// Return the first id in `pharmacy_ids`, in the order given, with no
/// `pharmacies` row.
fn first_missing_pharmacy(
  tx: &Transaction<'_>,
  pharmacy_ids: &[i64],
) -> rusqlite::Result<Option<i64>> {
  let mut stmt =
    tx.prepare_cached("SELECT EXISTS(SELECT 1 FROM pharmacies WHERE id = ?1)")?;
  for &id in pharmacy_ids {
    let exists: bool = stmt.query_row(params![id], |r| r.get(0))?;
    if !exists {
      return Ok(Some(id));
    }
  }
  Ok(None)
}

fn insert_links(
  tx: &Transaction<'_>,
  medicine_id: i64,
  pharmacy_ids: &[i64],
) -> rusqlite::Result<()> {
  let mut stmt = tx.prepare_cached(
    "INSERT INTO pharmacy_medicines (pharmacy_id, medicine_id) VALUES (?1, ?2)",
  )?;
  for &pharmacy_id in pharmacy_ids {
    stmt.execute(params![pharmacy_id, medicine_id])?;
  }
  Ok(())
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A pharmacy registry backed by a single SQLite file.
///
/// Clones share the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── PharmacyStore impl ──────────────────────────────────────────────────────

impl PharmacyStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let created_at = Utc::now();

    let username      = input.username.clone();
    let created_str   = encode_dt(created_at);
    let issued_str    = encode_dt(input.token_issued_at);
    let details       = input.details.clone();
    let position_str  = details.position.as_ref().to_owned();

    let (user_id, details_id) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "INSERT INTO users (
             username, password_hash, session_token, token_issued_at, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          params![
            input.username,
            input.password_hash,
            input.session_token,
            issued_str,
            created_str,
          ],
        )?;
        let user_id = tx.last_insert_rowid();

        tx.execute(
          "INSERT INTO user_details (
             user_id, first_name, second_name, email, phone_number, position
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![
            user_id,
            input.details.first_name,
            input.details.second_name,
            input.details.email,
            input.details.phone_number,
            position_str,
          ],
        )?;
        let details_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok((user_id, details_id))
      })
      .await?;

    Ok(User {
      id: user_id,
      username,
      created_at,
      details: UserDetails {
        id:           details_id,
        user_id,
        first_name:   details.first_name,
        second_name:  details.second_name,
        email:        details.email,
        phone_number: details.phone_number,
        position:     details.position,
      },
    })
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&format!("{SELECT_USER} WHERE u.id = ?1"), params![id], read_user)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("{SELECT_USER} ORDER BY u.id"))?;
        let rows = stmt
          .query_map([], read_user)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update_user(&self, id: i64, input: UserUpdate) -> Result<Option<User>> {
    let position_str = input.details.position.as_ref().to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let changed = match &input.password_hash {
          Some(hash) => tx.execute(
            "UPDATE users SET username = ?1, password_hash = ?2 WHERE id = ?3",
            params![input.username, hash, id],
          )?,
          None => tx.execute(
            "UPDATE users SET username = ?1 WHERE id = ?2",
            params![input.username, id],
          )?,
        };
        if changed == 0 {
          return Ok(None);
        }

        tx.execute(
          "UPDATE user_details
           SET first_name = ?1, second_name = ?2, email = ?3,
               phone_number = ?4, position = ?5
           WHERE user_id = ?6",
          params![
            input.details.first_name,
            input.details.second_name,
            input.details.email,
            input.details.phone_number,
            position_str,
            id,
          ],
        )?;

        let raw = tx.query_row(&format!("{SELECT_USER} WHERE u.id = ?1"), params![id], read_user)?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_user(&self, id: i64) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM user_details WHERE user_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    Ok(removed > 0)
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn find_credentials(&self, username: &str) -> Result<Option<Credentials>> {
    let username = username.to_owned();

    let raw: Option<RawCredentials> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT u.id, u.username, u.password_hash, u.session_token,
                      u.token_issued_at, d.position
               FROM users u
               JOIN user_details d ON d.user_id = u.id
               WHERE u.username = ?1",
              params![username],
              |row| {
                Ok(RawCredentials {
                  user_id:         row.get(0)?,
                  username:        row.get(1)?,
                  password_hash:   row.get(2)?,
                  session_token:   row.get(3)?,
                  token_issued_at: row.get(4)?,
                  position:        row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCredentials::into_credentials).transpose()
  }

  async fn find_session(&self, token: &str) -> Result<Option<Session>> {
    let token = token.to_owned();

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT u.id, d.position, u.token_issued_at
               FROM users u
               JOIN user_details d ON d.user_id = u.id
               WHERE u.session_token = ?1",
              params![token],
              |row| {
                Ok(RawSession {
                  user_id:   row.get(0)?,
                  position:  row.get(1)?,
                  issued_at: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn rotate_session(
    &self,
    user_id:   i64,
    token:     String,
    issued_at: DateTime<Utc>,
  ) -> Result<()> {
    let issued_str = encode_dt(issued_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET session_token = ?1, token_issued_at = ?2 WHERE id = ?3",
          params![token, issued_str, user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Pharmacies ────────────────────────────────────────────────────────────

  async fn create_pharmacy(&self, input: NewPharmacy) -> Result<Pharmacy> {
    let row = input.clone();

    let (pharmacy_id, address_id) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "INSERT INTO addresses (street, city, state, postal_code, country)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![
            row.address.street,
            row.address.city,
            row.address.state,
            row.address.postal_code,
            row.address.country,
          ],
        )?;
        let address_id = tx.last_insert_rowid();

        tx.execute(
          "INSERT INTO pharmacies (name, address_id) VALUES (?1, ?2)",
          params![row.name, address_id],
        )?;
        let pharmacy_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok((pharmacy_id, address_id))
      })
      .await?;

    Ok(Pharmacy {
      id:      pharmacy_id,
      name:    input.name,
      address: Address {
        id:          address_id,
        street:      input.address.street,
        city:        input.address.city,
        state:       input.address.state,
        postal_code: input.address.postal_code,
        country:     input.address.country,
      },
    })
  }

  async fn get_pharmacy(&self, id: i64) -> Result<Option<Pharmacy>> {
    let pharmacy = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{SELECT_PHARMACY} WHERE p.id = ?1"),
              params![id],
              read_pharmacy,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(pharmacy)
  }

  async fn list_pharmacies(&self) -> Result<Vec<Pharmacy>> {
    let pharmacies = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("{SELECT_PHARMACY} ORDER BY p.id"))?;
        let rows = stmt
          .query_map([], read_pharmacy)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(pharmacies)
  }

  async fn update_pharmacy(&self, id: i64, input: NewPharmacy) -> Result<Option<Pharmacy>> {
    let pharmacy = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let address_id: Option<i64> = tx
          .query_row(
            "SELECT address_id FROM pharmacies WHERE id = ?1",
            params![id],
            |r| r.get(0),
          )
          .optional()?;
        let Some(address_id) = address_id else {
          return Ok(None);
        };

        tx.execute(
          "UPDATE addresses
           SET street = ?1, city = ?2, state = ?3, postal_code = ?4, country = ?5
           WHERE id = ?6",
          params![
            input.address.street,
            input.address.city,
            input.address.state,
            input.address.postal_code,
            input.address.country,
            address_id,
          ],
        )?;
        tx.execute(
          "UPDATE pharmacies SET name = ?1 WHERE id = ?2",
          params![input.name, id],
        )?;

        let pharmacy = tx.query_row(
          &format!("{SELECT_PHARMACY} WHERE p.id = ?1"),
          params![id],
          read_pharmacy,
        )?;
        tx.commit()?;
        Ok(Some(pharmacy))
      })
      .await?;
    Ok(pharmacy)
  }

  async fn delete_pharmacy(&self, id: i64) -> Result<bool> {
    // Join rows cascade; the address goes via the `pharmacies_drop_address`
    // trigger.
    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM pharmacies WHERE id = ?1", params![id])?))
      .await?;
    Ok(removed > 0)
  }

  // ── Medicines ─────────────────────────────────────────────────────────────

  async fn create_medicine(&self, input: NewMedicine) -> Result<Medicine> {
    let price_cents  = input.price_cents()?;
    let link_ids     = input.distinct_pharmacy_ids();
    let date_str     = encode_date(input.production_date);
    let row          = input.clone();
    let mut pharmacy_ids = link_ids.clone();
    pharmacy_ids.sort_unstable();

    let outcome: Result<i64, pharmacy_core::Error> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Some(missing) = first_missing_pharmacy(&tx, &link_ids)? {
          tx.rollback()?;
          return Ok(Err(pharmacy_core::Error::PharmacyNotFound(missing)));
        }

        tx.execute(
          "INSERT INTO medicines (
             name, manufacturer, production_date, packaging, price_cents
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          params![row.name, row.manufacturer, date_str, row.packaging, price_cents],
        )?;
        let medicine_id = tx.last_insert_rowid();

        insert_links(&tx, medicine_id, &link_ids)?;

        tx.commit()?;
        Ok(Ok(medicine_id))
      })
      .await?;
    let medicine_id = outcome?;

    Ok(Medicine {
      id: medicine_id,
      name: input.name,
      manufacturer: input.manufacturer,
      production_date: input.production_date,
      packaging: input.packaging,
      price: pharmacy_core::medicine::price_from_cents(price_cents),
      pharmacy_ids,
    })
  }

  async fn get_medicine(&self, id: i64) -> Result<Option<Medicine>> {
    let raw: Option<RawMedicine> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(&format!("{SELECT_MEDICINE} WHERE id = ?1"), params![id], read_medicine)
          .optional()?;
        let Some(mut raw) = raw else {
          return Ok(None);
        };
        raw.pharmacy_ids = load_pharmacy_ids(conn, raw.id)?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawMedicine::into_medicine).transpose()
  }

  async fn list_medicines(&self) -> Result<Vec<Medicine>> {
    let raws: Vec<RawMedicine> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("{SELECT_MEDICINE} ORDER BY id"))?;
        let mut rows = stmt
          .query_map([], read_medicine)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut rows {
          raw.pharmacy_ids = load_pharmacy_ids(conn, raw.id)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMedicine::into_medicine).collect()
  }

  async fn update_medicine(&self, id: i64, input: NewMedicine) -> Result<Option<Medicine>> {
    let price_cents  = input.price_cents()?;
    let link_ids     = input.distinct_pharmacy_ids();
    let date_str     = encode_date(input.production_date);
    let row          = input.clone();
    let mut pharmacy_ids = link_ids.clone();
    pharmacy_ids.sort_unstable();

    let outcome: Result<bool, pharmacy_core::Error> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
          "SELECT EXISTS(SELECT 1 FROM medicines WHERE id = ?1)",
          params![id],
          |r| r.get(0),
        )?;
        if !exists {
          return Ok(Ok(false));
        }

        if let Some(missing) = first_missing_pharmacy(&tx, &link_ids)? {
          tx.rollback()?;
          return Ok(Err(pharmacy_core::Error::PharmacyNotFound(missing)));
        }

        tx.execute(
          "UPDATE medicines
           SET name = ?1, manufacturer = ?2, production_date = ?3,
               packaging = ?4, price_cents = ?5
           WHERE id = ?6",
          params![row.name, row.manufacturer, date_str, row.packaging, price_cents, id],
        )?;
        tx.execute("DELETE FROM pharmacy_medicines WHERE medicine_id = ?1", params![id])?;
        insert_links(&tx, id, &link_ids)?;

        tx.commit()?;
        Ok(Ok(true))
      })
      .await?;

    if !outcome? {
      return Ok(None);
    }

    Ok(Some(Medicine {
      id,
      name: input.name,
      manufacturer: input.manufacturer,
      production_date: input.production_date,
      packaging: input.packaging,
      price: pharmacy_core::medicine::price_from_cents(price_cents),
      pharmacy_ids,
    }))
  }

  async fn delete_medicine(&self, id: i64) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM medicines WHERE id = ?1", params![id])?))
      .await?;
    Ok(removed > 0)
  }
}
