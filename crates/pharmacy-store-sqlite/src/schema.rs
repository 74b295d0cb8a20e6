//! SQL schema for the pharmacy SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    username        TEXT NOT NULL UNIQUE,
    password_hash   TEXT NOT NULL,               -- argon2 PHC string
    session_token   TEXT NOT NULL UNIQUE,
    token_issued_at TEXT NOT NULL,               -- ISO 8601 UTC
    created_at      TEXT NOT NULL                -- ISO 8601 UTC; server-assigned
);

-- Exactly one row per user. No cascade: deletes remove this row first.
CREATE TABLE IF NOT EXISTS user_details (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL UNIQUE REFERENCES users(id),
    first_name   TEXT NOT NULL,
    second_name  TEXT NOT NULL,
    email        TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    position     TEXT NOT NULL CHECK (position IN ('Developer', 'Seller', 'Buyer'))
);

CREATE TABLE IF NOT EXISTS addresses (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    street      TEXT NOT NULL,
    city        TEXT NOT NULL,
    state       TEXT,
    postal_code TEXT,
    country     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pharmacies (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    address_id INTEGER NOT NULL UNIQUE REFERENCES addresses(id)
);

-- An address belongs to one pharmacy and goes away with it.
CREATE TRIGGER IF NOT EXISTS pharmacies_drop_address
AFTER DELETE ON pharmacies
BEGIN
    DELETE FROM addresses WHERE id = OLD.address_id;
END;

CREATE TABLE IF NOT EXISTS medicines (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    manufacturer    TEXT NOT NULL,
    production_date TEXT NOT NULL,               -- YYYY-MM-DD
    packaging       TEXT NOT NULL,
    price_cents     INTEGER NOT NULL CHECK (price_cents >= 0)
);

CREATE TABLE IF NOT EXISTS pharmacy_medicines (
    pharmacy_id INTEGER NOT NULL REFERENCES pharmacies(id) ON DELETE CASCADE,
    medicine_id INTEGER NOT NULL REFERENCES medicines(id)  ON DELETE CASCADE,
    PRIMARY KEY (pharmacy_id, medicine_id)
);

CREATE INDEX IF NOT EXISTS pharmacy_medicines_medicine_idx
    ON pharmacy_medicines(medicine_id);

PRAGMA user_version = 1;
";
