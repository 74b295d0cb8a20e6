//! Role-based access rules.
//!
//! Each gated route declares the [`Position`] it requires. Whether a caller's
//! position satisfies that requirement is decided by [`RULES`], keyed by the
//! required position and the kind of access the request performs. Adding a
//! role or an exception means adding a row, not a branch.

use crate::user::Position;

/// Whether a request reads or mutates the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
  Read,
  Write,
}

/// One row of the rule table.
#[derive(Debug, Clone, Copy)]
pub struct AccessRule {
  pub required: Position,
  pub access:   Access,
  pub allowed:  &'static [Position],
}

/// The full rule table. A `(required, access)` pair with no row denies
/// everyone.
pub const RULES: &[AccessRule] = &[
  AccessRule {
    required: Position::Developer,
    access:   Access::Read,
    allowed:  &[Position::Developer],
  },
  AccessRule {
    required: Position::Developer,
    access:   Access::Write,
    allowed:  &[Position::Developer],
  },
  // Buyers may browse what sellers manage, but not change it.
  AccessRule {
    required: Position::Seller,
    access:   Access::Read,
    allowed:  &[Position::Seller, Position::Buyer],
  },
  AccessRule {
    required: Position::Seller,
    access:   Access::Write,
    allowed:  &[Position::Seller],
  },
  AccessRule {
    required: Position::Buyer,
    access:   Access::Read,
    allowed:  &[Position::Buyer],
  },
  AccessRule {
    required: Position::Buyer,
    access:   Access::Write,
    allowed:  &[Position::Buyer],
  },
];

/// Look up the positions allowed for `required` under `access`.
pub fn allowed_positions(required: Position, access: Access) -> &'static [Position] {
  RULES
    .iter()
    .find(|rule| rule.required == required && rule.access == access)
    .map(|rule| rule.allowed)
    .unwrap_or(&[])
}

/// Decide whether a caller holding `actual` may perform `access` on a route
/// that requires `required`.
pub fn permits(required: Position, access: Access, actual: Position) -> bool {
  allowed_positions(required, access).contains(&actual)
}
