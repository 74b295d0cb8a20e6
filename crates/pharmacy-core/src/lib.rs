//! Core types and trait definitions for the pharmacy registry.
//!
//! No HTTP or database code lives here; the store backend and the API crate
//! both build on these types.

pub mod access;
pub mod error;
pub mod medicine;
pub mod pharmacy;
pub mod store;
pub mod user;

pub use error::{DomainError, Error, Result};
